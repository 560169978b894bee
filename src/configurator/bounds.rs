//! Scene-graph measurement: world-space bounds and seat points for ring parts.

use crate::configurator::{GEM_NAME_TOKEN, SEAT_SLICE_FRACTION};
use bevy::ecs::system::SystemParam;
use bevy::math::Affine3A;
use bevy::mesh::VertexAttributeValues;
use bevy::prelude::*;

/// Names containing this token mark gem geometry, which never contributes to
/// structural bounds or seats.
pub fn is_gem_label(label: &str) -> bool {
    label.to_lowercase().contains(GEM_NAME_TOKEN)
}

/// World-space axis-aligned box over some set of meshes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl PartBounds {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn union(self, other: PartBounds) -> PartBounds {
        PartBounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// One mesh reached during a part traversal, with its effective world affine.
/// `gem` is true when the mesh or any ancestor inside the part carries a gem
/// name, so unnamed glTF primitive children inherit their node's class.
pub struct MeshInstance<'a> {
    pub entity: Entity,
    pub world: Affine3A,
    pub mesh: &'a Mesh,
    pub gem: bool,
}

/// Box of a single mesh under an affine, from the eight corners of its local
/// position bounds.
fn mesh_world_box(mesh: &Mesh, world: Affine3A) -> Option<PartBounds> {
    let Some(VertexAttributeValues::Float32x3(positions)) =
        mesh.attribute(Mesh::ATTRIBUTE_POSITION)
    else {
        return None;
    };
    if positions.is_empty() {
        return None;
    }

    let mut local_min = Vec3::splat(f32::INFINITY);
    let mut local_max = Vec3::splat(f32::NEG_INFINITY);
    for p in positions {
        let v = Vec3::from(*p);
        local_min = local_min.min(v);
        local_max = local_max.max(v);
    }

    let corners = [
        Vec3::new(local_min.x, local_min.y, local_min.z),
        Vec3::new(local_min.x, local_min.y, local_max.z),
        Vec3::new(local_min.x, local_max.y, local_min.z),
        Vec3::new(local_min.x, local_max.y, local_max.z),
        Vec3::new(local_max.x, local_min.y, local_min.z),
        Vec3::new(local_max.x, local_min.y, local_max.z),
        Vec3::new(local_max.x, local_max.y, local_min.z),
        Vec3::new(local_max.x, local_max.y, local_max.z),
    ];

    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for corner in corners {
        let p = world.transform_point3(corner);
        min = min.min(p);
        max = max.max(p);
    }

    Some(PartBounds { min, max })
}

/// Read and write access to the spawned ring hierarchy. All world-space math
/// goes through local transforms rather than `GlobalTransform`, so edits made
/// earlier in the same frame are already visible.
#[derive(SystemParam)]
pub struct SceneGraph<'w, 's> {
    pub children: Query<'w, 's, &'static Children>,
    pub parents: Query<'w, 's, &'static ChildOf>,
    pub names: Query<'w, 's, &'static Name>,
    pub mesh_handles: Query<'w, 's, &'static Mesh3d>,
    pub transforms: Query<'w, 's, &'static mut Transform>,
}

impl SceneGraph<'_, '_> {
    pub fn local_affine(&self, entity: Entity) -> Affine3A {
        self.transforms
            .get(entity)
            .map(|transform| transform.compute_affine())
            .unwrap_or(Affine3A::IDENTITY)
    }

    /// World affine of an entity, composed from its own and all ancestor
    /// local transforms.
    pub fn world_affine(&self, entity: Entity) -> Affine3A {
        let mut affine = self.local_affine(entity);
        let mut current = entity;
        while let Ok(child_of) = self.parents.get(current) {
            current = child_of.parent();
            affine = self.local_affine(current) * affine;
        }
        affine
    }

    pub fn is_descendant_of(&self, entity: Entity, ancestor: Entity) -> bool {
        let mut current = entity;
        while let Ok(child_of) = self.parents.get(current) {
            current = child_of.parent();
            if current == ancestor {
                return true;
            }
        }
        false
    }

    /// Visits every mesh under `root`, depth-first. `root_affine` stands in
    /// for the root's world placement, so callers can measure a part at a
    /// pose other than its current one. The `skip` subtree is left out
    /// entirely.
    pub fn visit_meshes(
        &self,
        root: Entity,
        root_affine: Affine3A,
        skip: Option<Entity>,
        meshes: &Assets<Mesh>,
        visit: &mut dyn FnMut(MeshInstance),
    ) {
        self.visit_meshes_inner(root, root_affine, false, skip, meshes, visit);
    }

    fn visit_meshes_inner(
        &self,
        entity: Entity,
        world: Affine3A,
        inherited_gem: bool,
        skip: Option<Entity>,
        meshes: &Assets<Mesh>,
        visit: &mut dyn FnMut(MeshInstance),
    ) {
        if Some(entity) == skip {
            return;
        }

        let gem = inherited_gem
            || self
                .names
                .get(entity)
                .is_ok_and(|name| is_gem_label(name.as_str()));

        if let Ok(mesh_handle) = self.mesh_handles.get(entity) {
            if let Some(mesh) = meshes.get(&mesh_handle.0) {
                visit(MeshInstance {
                    entity,
                    world,
                    mesh,
                    gem,
                });
            }
        }

        let Ok(children) = self.children.get(entity) else {
            return;
        };
        for child in children.iter() {
            let child_world = world * self.local_affine(child);
            self.visit_meshes_inner(child, child_world, gem, skip, meshes, visit);
        }
    }

    /// World bounds of a part's structural geometry. Gem meshes are excluded;
    /// if the part has nothing but gems, the whole part is measured instead.
    /// `None` means no measurable mesh was found at all.
    pub fn structural_bounds(
        &self,
        root: Entity,
        root_affine: Affine3A,
        skip: Option<Entity>,
        meshes: &Assets<Mesh>,
    ) -> Option<PartBounds> {
        let mut structural: Option<PartBounds> = None;
        let mut any: Option<PartBounds> = None;

        self.visit_meshes(root, root_affine, skip, meshes, &mut |instance| {
            let Some(bounds) = mesh_world_box(instance.mesh, instance.world) else {
                return;
            };
            any = Some(any.map_or(bounds, |b| b.union(bounds)));
            if !instance.gem {
                structural = Some(structural.map_or(bounds, |b| b.union(bounds)));
            }
        });

        structural.or(any)
    }

    /// Seat of a part: the centroid of its lowest band of structural
    /// vertices, at the lowest vertex height. A part without structural
    /// geometry seats at its own origin.
    pub fn bottom_seat(&self, root: Entity, root_affine: Affine3A, meshes: &Assets<Mesh>) -> Vec3 {
        let mut points: Vec<Vec3> = Vec::new();
        self.visit_meshes(root, root_affine, None, meshes, &mut |instance| {
            if instance.gem {
                return;
            }
            let Some(VertexAttributeValues::Float32x3(positions)) =
                instance.mesh.attribute(Mesh::ATTRIBUTE_POSITION)
            else {
                return;
            };
            for p in positions {
                points.push(instance.world.transform_point3(Vec3::from(*p)));
            }
        });

        if points.is_empty() {
            return root_affine.translation.into();
        }

        let min_y = points
            .iter()
            .map(|p| p.y)
            .fold(f32::INFINITY, f32::min);
        let threshold = min_y + min_y.abs() * SEAT_SLICE_FRACTION;

        let mut sum = Vec2::ZERO;
        let mut count = 0u32;
        for point in &points {
            if point.y <= threshold {
                sum += Vec2::new(point.x, point.z);
                count += 1;
            }
        }

        let mean = sum / count.max(1) as f32;
        Vec3::new(mean.x, min_y, mean.y)
    }
}

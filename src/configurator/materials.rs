use crate::configurator::bounds::SceneGraph;
use crate::configurator::config::{MetalColor, RingConfig};
use bevy::math::Affine3A;
use bevy::prelude::*;

/// Mesh entities of the assembled ring, split into recolorable metal and
/// untouchable gem geometry.
#[derive(Debug, Default, Clone)]
pub struct RingMeshSets {
    pub metal: Vec<Entity>,
    pub diamond: Vec<Entity>,
}

pub fn classify_ring_meshes(
    graph: &SceneGraph,
    meshes: &Assets<Mesh>,
    roots: impl IntoIterator<Item = Entity>,
) -> RingMeshSets {
    let mut sets = RingMeshSets::default();
    for root in roots {
        graph.visit_meshes(root, Affine3A::IDENTITY, None, meshes, &mut |instance| {
            if instance.gem {
                sets.diamond.push(instance.entity);
            } else {
                sets.metal.push(instance.entity);
            }
        });
    }
    sets
}

/// Writes the configured metal color into every metal mesh's material. With
/// two-tone on, meshes inside the head keep white while the rest take the
/// configured color. Gem materials are never touched.
pub fn apply_metal_colors(
    graph: &SceneGraph,
    sets: &RingMeshSets,
    head_root: Option<Entity>,
    config: &RingConfig,
    material_handles: &Query<&MeshMaterial3d<StandardMaterial>>,
    materials: &mut Assets<StandardMaterial>,
) {
    let primary = config.metal_color.linear();
    let secondary = if config.two_tone {
        MetalColor::White.linear()
    } else {
        primary
    };

    for &entity in &sets.metal {
        let in_head = head_root
            .is_some_and(|head| entity == head || graph.is_descendant_of(entity, head));
        let color = if in_head { secondary } else { primary };

        let Ok(handle) = material_handles.get(entity) else {
            continue;
        };
        if let Some(material) = materials.get_mut(&handle.0) {
            material.base_color = Color::LinearRgba(color);
        }
    }
}

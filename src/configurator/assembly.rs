//! Placement of loaded parts: welding the head onto the shank and lining up
//! matching bands.

use crate::configurator::bounds::SceneGraph;
use crate::configurator::{BAND_GAP, HEAD_SINK_FRACTION};
use bevy::math::Affine3A;
use bevy::prelude::*;

/// Seats the head on top of the shank and parents it there.
///
/// The head's current transform is never an input: it is measured as if
/// freshly reset to the requested uniform scale at the shank's frame, so
/// repeated runs produce the same placement. The shank is measured without
/// the head subtree, so a previously welded head does not distort its bounds.
pub fn attach_head_to_shank(
    graph: &mut SceneGraph,
    meshes: &Assets<Mesh>,
    commands: &mut Commands,
    shank: Entity,
    head: Entity,
    scale: f32,
) {
    let shank_world = graph.world_affine(shank);

    let Some(shank_bounds) = graph.structural_bounds(shank, shank_world, Some(head), meshes)
    else {
        warn!("shank has no measurable geometry; seating head at its origin");
        if let Ok(mut transform) = graph.transforms.get_mut(head) {
            *transform = Transform::from_scale(Vec3::splat(scale));
        }
        commands.entity(head).insert(ChildOf(shank));
        return;
    };

    let seat_target = Vec3::new(
        shank_bounds.center().x,
        shank_bounds.max.y,
        shank_bounds.center().z,
    );

    // Where the head's seat would sit if it were parented to the shank with
    // an identity transform at the requested scale.
    let canonical = shank_world * Affine3A::from_scale(Vec3::splat(scale));
    let head_seat = graph.bottom_seat(head, canonical, meshes);

    let mut offset = seat_target - head_seat;
    offset.y -= HEAD_SINK_FRACTION * shank_bounds.height();
    let local = shank_world.inverse().transform_vector3(offset);

    if let Ok(mut transform) = graph.transforms.get_mut(head) {
        *transform = Transform {
            translation: local,
            rotation: Quat::IDENTITY,
            scale: Vec3::splat(scale),
        };
    }
    commands.entity(head).insert(ChildOf(shank));
}

/// Slides the matching band up against the shank along the z axis, and when
/// a second band is present, mirrors it onto the far side. Only translation
/// changes, so reruns converge instead of drifting.
pub fn place_matching_bands(
    graph: &mut SceneGraph,
    meshes: &Assets<Mesh>,
    shank: Entity,
    head: Option<Entity>,
    band: Entity,
    duplicate: Option<Entity>,
) {
    let shank_world = graph.world_affine(shank);
    let Some(shank_bounds) = graph.structural_bounds(shank, shank_world, head, meshes) else {
        warn!("shank has no measurable geometry; leaving matching band in place");
        return;
    };

    let band_world = graph.world_affine(band);
    let Some(band_bounds) = graph.structural_bounds(band, band_world, None, meshes) else {
        warn!("matching band has no measurable geometry; leaving it in place");
        return;
    };

    let band_width = band_bounds.max.z - band_bounds.min.z;
    let band_center_z = (band_bounds.min.z + band_bounds.max.z) * 0.5;
    let target_left = shank_bounds.min.z - band_width * 0.5 - BAND_GAP;
    let target_right = shank_bounds.max.z + band_width * 0.5 + BAND_GAP;

    // World-space deltas converted into the bands' parent frame.
    let parent_affine = match graph.parents.get(band) {
        Ok(child_of) => graph.world_affine(child_of.parent()),
        Err(_) => Affine3A::IDENTITY,
    };
    let parent_inverse = parent_affine.inverse();
    let slide = parent_inverse.transform_vector3(Vec3::new(0.0, 0.0, target_left - band_center_z));

    let band_transform = match graph.transforms.get_mut(band) {
        Ok(mut transform) => {
            transform.translation += slide;
            *transform
        }
        Err(_) => return,
    };

    if let Some(duplicate) = duplicate {
        let across =
            parent_inverse.transform_vector3(Vec3::new(0.0, 0.0, target_right - target_left));
        if let Ok(mut transform) = graph.transforms.get_mut(duplicate) {
            *transform = band_transform;
            transform.translation += across;
        }
    }
}

use crate::configurator::viewer::ViewerCamera;
use crate::configurator::{AUTO_ROTATE_SPEED, CAMERA_MAX_DISTANCE, CAMERA_MIN_DISTANCE, CAMERA_START_POSITION};
use bevy::camera::Viewport;
use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll};
use bevy::prelude::*;
use bevy::window::{PrimaryWindow, Window};

#[derive(Resource)]
pub struct OrbitCameraState {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub auto_rotate: bool,
    pub auto_rotate_speed: f32,
}

impl OrbitCameraState {
    pub fn from_position(position: Vec3, target: Vec3) -> Self {
        let offset = position - target;
        let distance = offset.length().max(0.01);
        Self {
            target,
            distance,
            yaw: offset.x.atan2(offset.z),
            pitch: (offset.y / distance).asin(),
            min_distance: CAMERA_MIN_DISTANCE,
            max_distance: CAMERA_MAX_DISTANCE,
            auto_rotate: false,
            auto_rotate_speed: AUTO_ROTATE_SPEED,
        }
    }
}

impl Default for OrbitCameraState {
    fn default() -> Self {
        let mut state = OrbitCameraState::from_position(CAMERA_START_POSITION, Vec3::ZERO);
        state.distance = state.distance.clamp(state.min_distance, state.max_distance);
        state
    }
}

#[derive(Resource, Default)]
pub struct UiInteractionState {
    pub wants_pointer_input: bool,
    pub side_panel_width: f32,
}

/// Unit offset from the orbit target toward the camera, Y up.
fn orbit_offset(yaw: f32, pitch: f32) -> Vec3 {
    Vec3::new(
        yaw.sin() * pitch.cos(),
        pitch.sin(),
        yaw.cos() * pitch.cos(),
    )
    .normalize_or_zero()
}

/// Spins the orbit while auto-rotate is on and the user is not dragging.
pub fn advance_auto_rotate(orbit: &mut OrbitCameraState, dt: f32, user_orbiting: bool) {
    if orbit.auto_rotate && !user_orbiting {
        orbit.yaw += orbit.auto_rotate_speed * dt;
    }
}

/// Keeps the 3D viewport clear of the control panel docked on the right.
pub fn update_camera_viewport(
    windows: Query<&Window, With<PrimaryWindow>>,
    ui_state: Res<UiInteractionState>,
    mut camera_query: Query<&mut Camera, With<ViewerCamera>>,
) {
    let Ok(window) = windows.single() else {
        return;
    };

    let physical_width = window.physical_width();
    let physical_height = window.physical_height().max(1);
    if physical_width == 0 {
        return;
    }

    let panel_px = (ui_state.side_panel_width.max(0.0) * window.scale_factor() as f32) as u32;
    let viewport_width = physical_width.saturating_sub(panel_px).max(1);

    let viewport = Some(Viewport {
        physical_position: UVec2::new(0, 0),
        physical_size: UVec2::new(viewport_width, physical_height),
        depth: 0.0..1.0,
    });

    for mut camera in &mut camera_query {
        camera.viewport = viewport.clone();
    }
}

pub fn orbit_camera_system(
    time: Res<Time>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    ui_state: Res<UiInteractionState>,
    mut orbit: ResMut<OrbitCameraState>,
    mut camera_query: Query<&mut Transform, With<ViewerCamera>>,
) {
    let mouse_delta = Vec2::new(mouse_motion.delta.x, -mouse_motion.delta.y);
    let scroll_delta = mouse_scroll.delta.y;

    let pointer_in_window = windows
        .single()
        .ok()
        .and_then(|w| w.cursor_position())
        .is_some();
    let can_capture_mouse = pointer_in_window && !ui_state.wants_pointer_input;
    let orbiting = can_capture_mouse && mouse_buttons.pressed(MouseButton::Left);

    if orbiting && mouse_delta.length_squared() > 0.0 {
        orbit.yaw -= mouse_delta.x * 0.006;
        orbit.pitch = (orbit.pitch + mouse_delta.y * 0.006).clamp(-1.45, 1.45);
    }

    if can_capture_mouse && scroll_delta.abs() > f32::EPSILON {
        let zoom_factor = (1.0 - scroll_delta * 0.10).clamp(0.2, 5.0);
        orbit.distance *= zoom_factor;
    }
    orbit.distance = orbit.distance.clamp(orbit.min_distance, orbit.max_distance);

    advance_auto_rotate(&mut orbit, time.delta_secs(), orbiting);

    let camera_position = orbit.target + orbit_offset(orbit.yaw, orbit.pitch) * orbit.distance;
    for mut transform in &mut camera_query {
        *transform = Transform::from_translation(camera_position).looking_at(orbit.target, Vec3::Y);
    }
}

pub mod assembly;
pub mod bounds;
pub mod camera;
pub mod catalog;
pub mod config;
pub mod launch;
pub mod materials;
pub mod sync;
pub mod ui;
pub mod viewer;

use bevy::math::Vec3;

pub const CATALOG_PATH: &str = "config/ring_catalog.ron";

/// Meshes whose assigned name contains this token (case-insensitive) are gem
/// geometry, excluded from structural bounds and skipped when recoloring.
pub const GEM_NAME_TOKEN: &str = "diamond";

/// Fraction of |minY| above the lowest vertex that still counts as the
/// bottom slice when locating a part's seat.
pub const SEAT_SLICE_FRACTION: f32 = 0.25;

/// How far the head sinks into the shank, as a fraction of the shank's
/// structural height.
pub const HEAD_SINK_FRACTION: f32 = 0.05;

/// Lateral clearance between shank and matching band. Negative forces a
/// slight overlap so no seam is visible.
pub const BAND_GAP: f32 = -0.05;

/// Uniform head scale at exactly 1.0 carat.
pub const BASE_HEAD_SCALE: f32 = 0.4;

pub const CAMERA_START_POSITION: Vec3 = Vec3::new(3.0, -0.8, 1.2);
pub const CAMERA_MIN_DISTANCE: f32 = 4.0;
pub const CAMERA_MAX_DISTANCE: f32 = 15.0;
pub const AUTO_ROTATE_SPEED: f32 = 0.5;

/// Frames to wait after the first complete assembly before announcing
/// readiness, so the renderer has presented the result.
pub const READY_SETTLE_FRAMES: u8 = 2;

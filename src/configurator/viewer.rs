use crate::configurator::CAMERA_START_POSITION;
use crate::configurator::camera::{
    OrbitCameraState, UiInteractionState, orbit_camera_system, update_camera_viewport,
};
use crate::configurator::catalog::load_initial_catalog;
use crate::configurator::config::{ConfigUpdate, RingConfig};
use crate::configurator::launch::{LaunchOptions, resolve_initial};
use crate::configurator::sync::{
    AssemblyState, ViewerReadiness, apply_config_updates, poll_part_loads, refresh_assembly,
    refresh_colors, update_readiness,
};
use crate::configurator::ui::ui_system;
use bevy::camera::ClearColorConfig;
use bevy::camera::visibility::RenderLayers;
use bevy::prelude::*;
use bevy::window::{PresentMode, Window, WindowPlugin};
use bevy_egui::{EguiPlugin, EguiPrimaryContextPass, PrimaryEguiContext};

/// Marker for the 3D camera that renders the ring.
#[derive(Component)]
pub struct ViewerCamera;

/// Configuration event staged from the command line, written on the first frame.
#[derive(Resource, Debug, Clone)]
pub struct InitialConfiguration(pub ConfigUpdate);

pub fn run(options: LaunchOptions) {
    let catalog = load_initial_catalog(&options.catalog_path);
    let (initial, panel) = resolve_initial(&options, &catalog);

    App::new()
        .insert_resource(catalog)
        .insert_resource(RingConfig::default())
        .insert_resource(OrbitCameraState::default())
        .insert_resource(UiInteractionState::default())
        .insert_resource(panel)
        .insert_resource(InitialConfiguration(initial))
        .insert_resource(ClearColor(Color::srgb(0.96, 0.96, 0.97)))
        .insert_resource(GlobalAmbientLight {
            color: Color::srgb(0.85, 0.87, 0.9),
            brightness: 300.0,
            affects_lightmapped_meshes: true,
        })
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Ring Configurator".to_string(),
                resolution: (1600, 1000).into(),
                present_mode: PresentMode::AutoVsync,
                ..Default::default()
            }),
            ..Default::default()
        }))
        .add_plugins(EguiPlugin::default())
        .add_message::<ConfigUpdate>()
        .add_message::<ViewerReadiness>()
        .add_systems(
            Startup,
            (setup_viewer_scene, send_initial_configuration).chain(),
        )
        .add_systems(
            Update,
            (
                apply_config_updates,
                poll_part_loads,
                refresh_assembly,
                refresh_colors,
                update_readiness,
            )
                .chain(),
        )
        .add_systems(Update, update_camera_viewport)
        .add_systems(Update, orbit_camera_system)
        .add_systems(EguiPrimaryContextPass, ui_system)
        .run();
}

pub fn setup_viewer_scene(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(CAMERA_START_POSITION).looking_at(Vec3::ZERO, Vec3::Y),
        ViewerCamera,
    ));
    commands.spawn((
        Camera2d,
        Camera {
            order: 1,
            clear_color: ClearColorConfig::None,
            ..default()
        },
        RenderLayers::layer(31),
        PrimaryEguiContext,
    ));

    commands.spawn((
        DirectionalLight {
            color: Color::srgb(1.0, 0.96, 0.88),
            shadows_enabled: true,
            illuminance: 14_000.0,
            ..default()
        },
        Transform::from_xyz(4.0, 6.0, 3.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            color: Color::srgb(0.8, 0.84, 0.9),
            shadows_enabled: false,
            illuminance: 4_000.0,
            ..default()
        },
        Transform::from_xyz(-5.0, 3.0, -4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    let ring_root = commands
        .spawn((
            Transform::default(),
            Visibility::default(),
            Name::new("RingAssembly"),
        ))
        .id();
    commands.insert_resource(AssemblyState::new(ring_root));
}

pub fn send_initial_configuration(
    initial: Res<InitialConfiguration>,
    mut updates: MessageWriter<ConfigUpdate>,
) {
    updates.write(initial.0.clone());
}

//! Keeps the spawned ring in step with the desired configuration: issues
//! model loads for changed parts, settles finished loads into the scene, and
//! schedules assembly and color recomputation.

use crate::configurator::READY_SETTLE_FRAMES;
use crate::configurator::assembly::{attach_head_to_shank, place_matching_bands};
use crate::configurator::bounds::SceneGraph;
use crate::configurator::camera::OrbitCameraState;
use crate::configurator::catalog::{RingCatalog, normalize_asset_path};
use crate::configurator::config::{BandMode, ConfigUpdate, RingConfig, head_scale_for_carat};
use crate::configurator::materials::{apply_metal_colors, classify_ring_meshes};
use bevy::asset::LoadState;
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Shank,
    Head,
    Band,
}

impl PartKind {
    pub const ALL: [PartKind; 3] = [PartKind::Shank, PartKind::Head, PartKind::Band];

    pub fn label(self) -> &'static str {
        match self {
            PartKind::Shank => "shank",
            PartKind::Head => "head",
            PartKind::Band => "band",
        }
    }
}

/// A model load on its way in. `ticket` records the generation that issued
/// it; only a load whose ticket still matches the current generation may be
/// installed when it finishes. `roots` stays empty until the glTF is loaded
/// and its scene instances have been spawned hidden.
#[derive(Debug, Clone)]
pub struct PendingLoad {
    pub ticket: u64,
    pub source: String,
    pub gltf: Handle<Gltf>,
    pub roots: Vec<Entity>,
    pub copies: usize,
}

/// Current occupant of one part slot plus whatever is in flight for it.
#[derive(Debug, Default)]
pub struct PartSlot {
    pub root: Option<Entity>,
    pub duplicate: Option<Entity>,
    pub source: Option<String>,
    pub copies: usize,
    pub in_flight: Vec<PendingLoad>,
}

/// One-shot startup outcome, reported outward exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Settling { frames_left: u8 },
    Announced,
    Failed(String),
}

#[derive(Message, Debug, Clone)]
pub struct ViewerReadiness {
    pub error: Option<String>,
}

#[derive(Resource, Debug)]
pub struct AssemblyState {
    pub generation: u64,
    pub ring_root: Entity,
    pub shank: PartSlot,
    pub head: PartSlot,
    pub band: PartSlot,
    pub layout_dirty: bool,
    pub colors_dirty: bool,
    pub readiness: Readiness,
}

impl AssemblyState {
    pub fn new(ring_root: Entity) -> Self {
        Self {
            generation: 0,
            ring_root,
            shank: PartSlot::default(),
            head: PartSlot::default(),
            band: PartSlot::default(),
            layout_dirty: false,
            colors_dirty: false,
            readiness: Readiness::Pending,
        }
    }

    pub fn slot(&self, kind: PartKind) -> &PartSlot {
        match kind {
            PartKind::Shank => &self.shank,
            PartKind::Head => &self.head,
            PartKind::Band => &self.band,
        }
    }

    pub fn slot_mut(&mut self, kind: PartKind) -> &mut PartSlot {
        match kind {
            PartKind::Shank => &mut self.shank,
            PartKind::Head => &mut self.head,
            PartKind::Band => &mut self.band,
        }
    }

    /// True while any load issued by the current generation is unfinished.
    /// Superseded loads do not count; they only get discarded.
    pub fn has_winning_loads(&self) -> bool {
        PartKind::ALL.iter().any(|&kind| {
            self.slot(kind)
                .in_flight
                .iter()
                .any(|pending| pending.ticket == self.generation)
        })
    }

    /// Installs a finished load, or discards it when a later event has
    /// superseded it. Installation swaps the slot's scene roots in one go
    /// and schedules a layout pass.
    pub fn settle_pending(&mut self, kind: PartKind, pending: PendingLoad, commands: &mut Commands) {
        let PendingLoad {
            ticket,
            source,
            roots,
            copies,
            ..
        } = pending;

        if ticket != self.generation {
            debug!("discarding superseded {} load '{source}'", kind.label());
            for root in roots {
                commands.entity(root).despawn();
            }
            return;
        }

        // Despawning the old shank would take the welded head down with it;
        // move the head back up to the assembly root first.
        if kind == PartKind::Shank {
            if let Some(head_root) = self.head.root {
                commands.entity(head_root).insert(ChildOf(self.ring_root));
            }
        }

        info!("installing {} model '{source}'", kind.label());
        let slot = self.slot_mut(kind);
        if let Some(old_root) = slot.root.take() {
            commands.entity(old_root).despawn();
        }
        if let Some(old_duplicate) = slot.duplicate.take() {
            commands.entity(old_duplicate).despawn();
        }

        slot.root = roots.first().copied();
        slot.duplicate = roots.get(1).copied();
        slot.source = Some(source);
        slot.copies = copies;
        for &root in &roots {
            commands.entity(root).insert(Visibility::Inherited);
        }

        self.layout_dirty = true;
    }
}

/// What each slot should hold for the current configuration, as
/// (source, copy count). `None` means the slot should be empty.
fn desired_sources(
    config: &RingConfig,
    catalog: &RingCatalog,
) -> [(PartKind, Option<String>, usize); 3] {
    let band_source = match config.band_mode {
        BandMode::None => None,
        _ => Some(match &config.band_asset {
            Some(token) => normalize_asset_path(token),
            None => catalog.band_asset.clone(),
        }),
    };

    [
        (PartKind::Shank, config.shank.clone(), 1),
        (PartKind::Head, config.head.clone(), 1),
        (PartKind::Band, band_source, config.band_mode.copies()),
    ]
}

/// Compares each slot against the desired configuration. A differing slot
/// gets a fresh ticketed load; a matching one is left alone, so events that
/// only touch colors or carat issue no loads at all.
pub fn reconcile_slots(
    state: &mut AssemblyState,
    config: &RingConfig,
    catalog: &RingCatalog,
    asset_server: &AssetServer,
    commands: &mut Commands,
) {
    let ticket = state.generation;

    for (kind, desired, copies) in desired_sources(config, catalog) {
        match desired {
            Some(source) => {
                let slot = state.slot_mut(kind);
                if slot.source.as_deref() == Some(source.as_str()) && slot.copies == copies {
                    continue;
                }
                debug!("requesting {} model '{source}'", kind.label());
                let gltf: Handle<Gltf> = asset_server.load(source.clone());
                slot.in_flight.push(PendingLoad {
                    ticket,
                    source,
                    gltf,
                    roots: Vec::new(),
                    copies,
                });
            }
            None => {
                let slot = state.slot_mut(kind);
                let mut removed = false;
                if let Some(root) = slot.root.take() {
                    commands.entity(root).despawn();
                    removed = true;
                }
                if let Some(duplicate) = slot.duplicate.take() {
                    commands.entity(duplicate).despawn();
                    removed = true;
                }
                slot.source = None;
                slot.copies = 0;
                if removed {
                    state.layout_dirty = true;
                }
            }
        }
    }
}

/// Applies inbound configuration updates. Every accepted event advances the
/// generation, which is what lets finished loads from older events be told
/// apart from current ones.
pub fn apply_config_updates(
    mut updates: MessageReader<ConfigUpdate>,
    mut state: ResMut<AssemblyState>,
    mut config: ResMut<RingConfig>,
    catalog: Res<RingCatalog>,
    asset_server: Res<AssetServer>,
    mut orbit: ResMut<OrbitCameraState>,
    mut commands: Commands,
) {
    for update in updates.read() {
        if matches!(state.readiness, Readiness::Failed(_)) {
            debug!("ignoring configuration update after startup failure");
            continue;
        }

        state.generation += 1;
        let delta = config.apply(update);

        if delta.camera_changed {
            orbit.auto_rotate = config.auto_rotate;
        }
        if delta.layout_changed {
            state.layout_dirty = true;
        }
        if delta.colors_changed {
            state.colors_dirty = true;
        }

        reconcile_slots(&mut state, &config, &catalog, &asset_server, &mut commands);
    }
}

/// Drives in-flight loads forward: spawns hidden scene instances once the
/// glTF is loaded, and settles an entry once all its instances are populated.
pub fn poll_part_loads(
    mut state: ResMut<AssemblyState>,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
    children: Query<&Children>,
    mut commands: Commands,
) {
    let ring_root = state.ring_root;

    for kind in PartKind::ALL {
        let mut settled: Vec<PendingLoad> = Vec::new();
        let slot = state.slot_mut(kind);
        let mut index = 0;

        while index < slot.in_flight.len() {
            let pending = &mut slot.in_flight[index];

            if pending.roots.is_empty() {
                match asset_server.get_load_state(pending.gltf.id()) {
                    Some(LoadState::Loaded) => {
                        let scene = gltf_assets.get(&pending.gltf).and_then(|gltf| {
                            gltf.default_scene
                                .clone()
                                .or_else(|| gltf.scenes.first().cloned())
                        });
                        match scene {
                            Some(scene) => {
                                for _ in 0..pending.copies {
                                    let root = commands
                                        .spawn((
                                            SceneRoot(scene.clone()),
                                            Transform::default(),
                                            Visibility::Hidden,
                                            ChildOf(ring_root),
                                        ))
                                        .id();
                                    pending.roots.push(root);
                                }
                                index += 1;
                            }
                            None => {
                                error!(
                                    "{} asset '{}' contains no scenes",
                                    kind.label(),
                                    pending.source
                                );
                                slot.in_flight.remove(index);
                            }
                        }
                    }
                    Some(LoadState::Failed(err)) => {
                        error!(
                            "failed to load {} asset '{}': {err}",
                            kind.label(),
                            pending.source
                        );
                        slot.in_flight.remove(index);
                    }
                    _ => {
                        index += 1;
                    }
                }
            } else {
                // Scene instances are populated asynchronously; children
                // under every root means the meshes are in place.
                let ready = pending
                    .roots
                    .iter()
                    .all(|&root| children.get(root).is_ok());
                if ready {
                    settled.push(slot.in_flight.remove(index));
                } else {
                    index += 1;
                }
            }
        }

        for pending in settled {
            state.settle_pending(kind, pending, &mut commands);
        }
    }
}

/// Re-seats the head and bands once every load belonging to the current
/// generation has settled. Running earlier would measure a half-updated
/// ring.
pub fn refresh_assembly(
    mut state: ResMut<AssemblyState>,
    config: Res<RingConfig>,
    mut graph: SceneGraph,
    meshes: Res<Assets<Mesh>>,
    mut commands: Commands,
) {
    if !state.layout_dirty || state.has_winning_loads() {
        return;
    }
    state.layout_dirty = false;
    state.colors_dirty = true;

    let Some(shank_root) = state.shank.root else {
        return;
    };

    if let Some(head_root) = state.head.root {
        attach_head_to_shank(
            &mut graph,
            &meshes,
            &mut commands,
            shank_root,
            head_root,
            head_scale_for_carat(config.carat),
        );
    }

    if let Some(band_root) = state.band.root {
        place_matching_bands(
            &mut graph,
            &meshes,
            shank_root,
            state.head.root,
            band_root,
            state.band.duplicate,
        );
    }
}

pub fn refresh_colors(
    mut state: ResMut<AssemblyState>,
    config: Res<RingConfig>,
    graph: SceneGraph,
    meshes: Res<Assets<Mesh>>,
    material_handles: Query<&MeshMaterial3d<StandardMaterial>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    if !state.colors_dirty || state.has_winning_loads() {
        return;
    }
    state.colors_dirty = false;

    // The head is welded under the shank, so traversing the shank covers it;
    // it only needs visiting on its own while no shank is present.
    let mut roots: Vec<Entity> = [state.shank.root, state.band.root, state.band.duplicate]
        .into_iter()
        .flatten()
        .collect();
    if state.shank.root.is_none() {
        if let Some(head_root) = state.head.root {
            roots.push(head_root);
        }
    }

    let sets = classify_ring_meshes(&graph, &meshes, roots);
    apply_metal_colors(
        &graph,
        &sets,
        state.head.root,
        &config,
        &material_handles,
        &mut materials,
    );
}

fn missing_parts_message(shank_missing: bool, head_missing: bool) -> String {
    match (shank_missing, head_missing) {
        (true, true) => "Both shank and head models could not be loaded.".to_string(),
        (true, false) => "Shank model could not be loaded.".to_string(),
        _ => "Head model could not be loaded.".to_string(),
    }
}

/// Watches the first configuration play out and reports the outcome exactly
/// once: success a couple of frames after the assembly settles, or a
/// failure naming the parts that never arrived.
pub fn update_readiness(
    mut state: ResMut<AssemblyState>,
    mut readiness_messages: MessageWriter<ViewerReadiness>,
) {
    // Nothing to judge before the first configuration event.
    if state.generation == 0 {
        return;
    }

    match state.readiness {
        Readiness::Pending => {
            if state.has_winning_loads() || state.layout_dirty || state.colors_dirty {
                return;
            }
            let shank_missing = state.shank.root.is_none();
            let head_missing = state.head.root.is_none();
            if shank_missing || head_missing {
                let message = missing_parts_message(shank_missing, head_missing);
                error!("{message}");
                readiness_messages.write(ViewerReadiness {
                    error: Some(message.clone()),
                });
                state.readiness = Readiness::Failed(message);
            } else {
                state.readiness = Readiness::Settling {
                    frames_left: READY_SETTLE_FRAMES,
                };
            }
        }
        Readiness::Settling { frames_left } => {
            if frames_left <= 1 {
                info!("ring assembly settled");
                readiness_messages.write(ViewerReadiness { error: None });
                state.readiness = Readiness::Announced;
            } else {
                state.readiness = Readiness::Settling {
                    frames_left: frames_left - 1,
                };
            }
        }
        Readiness::Announced | Readiness::Failed(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configurator::bounds::tests::spawn_mesh_box;
    use crate::configurator::catalog::default_ring_catalog;
    use approx::assert_relative_eq;
    use bevy::asset::AssetPlugin;
    use bevy::ecs::system::RunSystemOnce;

    fn ring_world() -> (World, Entity) {
        let mut world = World::new();
        world.insert_resource(Assets::<Mesh>::default());
        world.insert_resource(Assets::<Gltf>::default());
        let ring_root = world
            .spawn((Transform::default(), Visibility::default()))
            .id();
        world.insert_resource(AssemblyState::new(ring_root));
        (world, ring_root)
    }

    fn fake_pending(world: &mut World, ticket: u64, source: &str, roots: Vec<Entity>) -> PendingLoad {
        let gltf = world.resource::<Assets<Gltf>>().reserve_handle();
        let copies = roots.len().max(1);
        PendingLoad {
            ticket,
            source: source.to_string(),
            gltf,
            roots,
            copies,
        }
    }

    fn spawn_part_root(world: &mut World, ring_root: Entity) -> Entity {
        world
            .spawn((Transform::default(), Visibility::Hidden, ChildOf(ring_root)))
            .id()
    }

    fn settle(world: &mut World, kind: PartKind, pending: PendingLoad) {
        world
            .run_system_once(
                move |mut state: ResMut<AssemblyState>, mut commands: Commands| {
                    state.settle_pending(kind, pending.clone(), &mut commands);
                },
            )
            .expect("system should run");
    }

    #[test]
    fn test_superseded_load_is_discarded() {
        let (mut world, ring_root) = ring_world();
        let stale_root = spawn_part_root(&mut world, ring_root);
        world.resource_mut::<AssemblyState>().generation = 2;

        let pending = fake_pending(&mut world, 1, "models/shank-old.glb", vec![stale_root]);
        settle(&mut world, PartKind::Shank, pending);

        let state = world.resource::<AssemblyState>();
        assert_eq!(state.shank.root, None);
        assert_eq!(state.shank.source, None);
        assert!(!state.layout_dirty);
        assert!(world.get_entity(stale_root).is_err());
    }

    #[test]
    fn test_winning_load_commits_and_reveals() {
        let (mut world, ring_root) = ring_world();
        let root = spawn_part_root(&mut world, ring_root);
        world.resource_mut::<AssemblyState>().generation = 1;

        let pending = fake_pending(&mut world, 1, "models/shank-twist.glb", vec![root]);
        settle(&mut world, PartKind::Shank, pending);

        let state = world.resource::<AssemblyState>();
        assert_eq!(state.shank.root, Some(root));
        assert_eq!(state.shank.source.as_deref(), Some("models/shank-twist.glb"));
        assert!(state.layout_dirty);
        assert_eq!(
            world.entity(root).get::<Visibility>(),
            Some(&Visibility::Inherited)
        );
    }

    #[test]
    fn test_new_shank_rescues_the_welded_head() {
        let (mut world, ring_root) = ring_world();
        let old_shank = spawn_part_root(&mut world, ring_root);
        let head = world
            .spawn((Transform::default(), Visibility::Inherited, ChildOf(old_shank)))
            .id();
        let new_shank = spawn_part_root(&mut world, ring_root);
        {
            let mut state = world.resource_mut::<AssemblyState>();
            state.generation = 1;
            state.shank.root = Some(old_shank);
            state.shank.source = Some("models/shank-solitaire.glb".to_string());
            state.shank.copies = 1;
            state.head.root = Some(head);
        }

        let pending = fake_pending(&mut world, 1, "models/shank-garden.glb", vec![new_shank]);
        settle(&mut world, PartKind::Shank, pending);

        assert!(world.get_entity(old_shank).is_err());
        assert!(world.get_entity(head).is_ok());
        assert_eq!(
            world.entity(head).get::<ChildOf>().map(ChildOf::parent),
            Some(ring_root)
        );
        let state = world.resource::<AssemblyState>();
        assert_eq!(state.shank.root, Some(new_shank));
    }

    #[test]
    fn test_last_event_wins_across_orderings() {
        let (mut world, ring_root) = ring_world();
        let first_root = spawn_part_root(&mut world, ring_root);
        let second_root = spawn_part_root(&mut world, ring_root);
        world.resource_mut::<AssemblyState>().generation = 2;

        // The load from event 1 lands after event 2 already superseded it.
        let first = fake_pending(&mut world, 1, "models/shank-split.glb", vec![first_root]);
        settle(&mut world, PartKind::Shank, first);
        let second = fake_pending(&mut world, 2, "models/shank-twist.glb", vec![second_root]);
        settle(&mut world, PartKind::Shank, second);

        let state = world.resource::<AssemblyState>();
        assert_eq!(state.shank.root, Some(second_root));
        assert_eq!(state.shank.source.as_deref(), Some("models/shank-twist.glb"));
        assert!(world.get_entity(first_root).is_err());
        assert!(world.get_entity(second_root).is_ok());
    }

    #[test]
    fn test_double_band_commit_keeps_both_roots() {
        let (mut world, ring_root) = ring_world();
        let band = spawn_part_root(&mut world, ring_root);
        let duplicate = spawn_part_root(&mut world, ring_root);
        world.resource_mut::<AssemblyState>().generation = 1;

        let pending = fake_pending(
            &mut world,
            1,
            "models/matching-band.glb",
            vec![band, duplicate],
        );
        settle(&mut world, PartKind::Band, pending);

        let state = world.resource::<AssemblyState>();
        assert_eq!(state.band.root, Some(band));
        assert_eq!(state.band.duplicate, Some(duplicate));
        assert_eq!(state.band.copies, 2);
    }

    fn asset_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, AssetPlugin::default()));
        app.init_asset::<Gltf>();
        app.init_asset::<Mesh>();
        app.insert_resource(default_ring_catalog());
        app.insert_resource(OrbitCameraState::default());
        app.init_resource::<Messages<ConfigUpdate>>();
        let ring_root = app
            .world_mut()
            .spawn((Transform::default(), Visibility::default()))
            .id();
        app.world_mut().insert_resource(AssemblyState::new(ring_root));
        app
    }

    #[test]
    fn test_reconcile_loads_only_differing_slots() {
        let mut app = asset_app();
        app.insert_resource(RingConfig {
            shank: Some("models/shank-solitaire.glb".to_string()),
            head: Some("models/head-hidden-halo-round.glb".to_string()),
            ..RingConfig::default()
        });
        app.world_mut().resource_mut::<AssemblyState>().generation = 1;

        app.world_mut()
            .run_system_once(
                |mut state: ResMut<AssemblyState>,
                 config: Res<RingConfig>,
                 catalog: Res<RingCatalog>,
                 asset_server: Res<AssetServer>,
                 mut commands: Commands| {
                    reconcile_slots(&mut state, &config, &catalog, &asset_server, &mut commands);
                },
            )
            .expect("system should run");

        let state = app.world().resource::<AssemblyState>();
        assert_eq!(state.shank.in_flight.len(), 1);
        assert_eq!(state.shank.in_flight[0].ticket, 1);
        assert_eq!(state.head.in_flight.len(), 1);
        assert!(state.band.in_flight.is_empty());
    }

    #[test]
    fn test_reconcile_is_a_no_op_for_matching_slots() {
        let mut app = asset_app();
        app.insert_resource(RingConfig {
            shank: Some("models/shank-solitaire.glb".to_string()),
            head: Some("models/head-hidden-halo-round.glb".to_string()),
            carat: 2.5,
            ..RingConfig::default()
        });
        {
            let mut state = app.world_mut().resource_mut::<AssemblyState>();
            state.generation = 3;
            state.shank.source = Some("models/shank-solitaire.glb".to_string());
            state.shank.copies = 1;
            state.head.source = Some("models/head-hidden-halo-round.glb".to_string());
            state.head.copies = 1;
        }

        app.world_mut()
            .run_system_once(
                |mut state: ResMut<AssemblyState>,
                 config: Res<RingConfig>,
                 catalog: Res<RingCatalog>,
                 asset_server: Res<AssetServer>,
                 mut commands: Commands| {
                    reconcile_slots(&mut state, &config, &catalog, &asset_server, &mut commands);
                },
            )
            .expect("system should run");

        let state = app.world().resource::<AssemblyState>();
        assert!(state.shank.in_flight.is_empty());
        assert!(state.head.in_flight.is_empty());
        assert!(state.band.in_flight.is_empty());
    }

    #[test]
    fn test_disabling_the_band_clears_it_without_loading() {
        let mut app = asset_app();
        let ring_root = app.world().resource::<AssemblyState>().ring_root;
        let band = app
            .world_mut()
            .spawn((Transform::default(), Visibility::Inherited, ChildOf(ring_root)))
            .id();
        app.insert_resource(RingConfig {
            shank: Some("models/shank-solitaire.glb".to_string()),
            head: Some("models/head-hidden-halo-round.glb".to_string()),
            band_mode: BandMode::None,
            ..RingConfig::default()
        });
        {
            let mut state = app.world_mut().resource_mut::<AssemblyState>();
            state.generation = 2;
            state.shank.source = Some("models/shank-solitaire.glb".to_string());
            state.shank.copies = 1;
            state.head.source = Some("models/head-hidden-halo-round.glb".to_string());
            state.head.copies = 1;
            state.band.root = Some(band);
            state.band.source = Some("models/matching-band.glb".to_string());
            state.band.copies = 1;
        }

        app.world_mut()
            .run_system_once(
                |mut state: ResMut<AssemblyState>,
                 config: Res<RingConfig>,
                 catalog: Res<RingCatalog>,
                 asset_server: Res<AssetServer>,
                 mut commands: Commands| {
                    reconcile_slots(&mut state, &config, &catalog, &asset_server, &mut commands);
                },
            )
            .expect("system should run");

        let state = app.world().resource::<AssemblyState>();
        assert_eq!(state.band.root, None);
        assert_eq!(state.band.source, None);
        assert!(state.band.in_flight.is_empty());
        assert!(state.layout_dirty);
        assert!(app.world().get_entity(band).is_err());
    }

    #[test]
    fn test_update_events_advance_the_generation() {
        let mut app = asset_app();
        app.insert_resource(RingConfig::default());

        app.world_mut()
            .resource_mut::<Messages<ConfigUpdate>>()
            .write(ConfigUpdate {
                shank: Some("models/shank-twist.glb".to_string()),
                head: Some("models/head-hidden-halo-pear.glb".to_string()),
                auto_rotate: Some(true),
                ..ConfigUpdate::default()
            });
        app.world_mut()
            .run_system_once(apply_config_updates)
            .expect("system should run");

        let state = app.world().resource::<AssemblyState>();
        assert_eq!(state.generation, 1);
        assert_eq!(state.shank.in_flight.len(), 1);
        assert!(app.world().resource::<OrbitCameraState>().auto_rotate);
    }

    #[test]
    fn test_updates_after_startup_failure_are_ignored() {
        let mut app = asset_app();
        app.insert_resource(RingConfig::default());
        {
            let mut state = app.world_mut().resource_mut::<AssemblyState>();
            state.generation = 1;
            state.readiness = Readiness::Failed("Head model could not be loaded.".to_string());
        }

        app.world_mut()
            .resource_mut::<Messages<ConfigUpdate>>()
            .write(ConfigUpdate {
                shank: Some("models/shank-twist.glb".to_string()),
                ..ConfigUpdate::default()
            });
        app.world_mut()
            .run_system_once(apply_config_updates)
            .expect("system should run");

        let state = app.world().resource::<AssemblyState>();
        assert_eq!(state.generation, 1);
        assert!(state.shank.in_flight.is_empty());
    }

    #[test]
    fn test_carat_change_rescales_without_reloading() {
        let mut app = asset_app();
        let ring_root = app.world().resource::<AssemblyState>().ring_root;
        let shank = spawn_mesh_box(
            app.world_mut(),
            Some("Shank"),
            Transform::default(),
            Vec3::splat(-1.0),
            Vec3::splat(1.0),
            Some(ring_root),
        );
        let head = spawn_mesh_box(
            app.world_mut(),
            Some("Head"),
            Transform::default(),
            Vec3::splat(-0.5),
            Vec3::splat(0.5),
            Some(ring_root),
        );
        {
            let mut state = app.world_mut().resource_mut::<AssemblyState>();
            state.generation = 1;
            state.shank.root = Some(shank);
            state.shank.source = Some("models/shank-solitaire.glb".to_string());
            state.shank.copies = 1;
            state.head.root = Some(head);
            state.head.source = Some("models/head-hidden-halo-round.glb".to_string());
            state.head.copies = 1;
            state.layout_dirty = true;
        }
        app.insert_resource(RingConfig {
            shank: Some("models/shank-solitaire.glb".to_string()),
            head: Some("models/head-hidden-halo-round.glb".to_string()),
            ..RingConfig::default()
        });

        app.world_mut()
            .run_system_once(refresh_assembly)
            .expect("system should run");
        let scale = app
            .world()
            .entity(head)
            .get::<Transform>()
            .expect("head transform")
            .scale;
        assert_relative_eq!(scale.x, head_scale_for_carat(1.0), epsilon = 1e-6);
        assert_eq!(
            app.world().entity(head).get::<ChildOf>().map(ChildOf::parent),
            Some(shank)
        );

        app.world_mut()
            .resource_mut::<Messages<ConfigUpdate>>()
            .write(ConfigUpdate {
                carat: Some(2.0),
                ..ConfigUpdate::default()
            });
        app.world_mut()
            .run_system_once(apply_config_updates)
            .expect("system should run");

        {
            let state = app.world().resource::<AssemblyState>();
            assert_eq!(state.generation, 2);
            assert!(state.shank.in_flight.is_empty());
            assert!(state.head.in_flight.is_empty());
            assert!(state.layout_dirty);
        }

        app.world_mut()
            .run_system_once(refresh_assembly)
            .expect("system should run");
        let scale = app
            .world()
            .entity(head)
            .get::<Transform>()
            .expect("head transform")
            .scale;
        assert_relative_eq!(scale.x, head_scale_for_carat(2.0), epsilon = 1e-6);
    }

    fn run_readiness(world: &mut World) -> Vec<ViewerReadiness> {
        world
            .run_system_once(update_readiness)
            .expect("system should run");
        world
            .resource_mut::<Messages<ViewerReadiness>>()
            .drain()
            .collect()
    }

    #[test]
    fn test_readiness_waits_for_the_first_event() {
        let (mut world, _ring_root) = ring_world();
        world.insert_resource(Messages::<ViewerReadiness>::default());

        let messages = run_readiness(&mut world);
        assert!(messages.is_empty());
        assert_eq!(
            world.resource::<AssemblyState>().readiness,
            Readiness::Pending
        );
    }

    #[test]
    fn test_readiness_announces_exactly_once() {
        let (mut world, ring_root) = ring_world();
        world.insert_resource(Messages::<ViewerReadiness>::default());
        let shank = spawn_part_root(&mut world, ring_root);
        let head = spawn_part_root(&mut world, ring_root);
        {
            let mut state = world.resource_mut::<AssemblyState>();
            state.generation = 1;
            state.shank.root = Some(shank);
            state.head.root = Some(head);
        }

        // Two settle frames pass before the announcement.
        assert!(run_readiness(&mut world).is_empty());
        assert!(run_readiness(&mut world).is_empty());
        let messages = run_readiness(&mut world);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].error, None);

        assert!(run_readiness(&mut world).is_empty());
        assert_eq!(
            world.resource::<AssemblyState>().readiness,
            Readiness::Announced
        );
    }

    #[test]
    fn test_readiness_failure_names_the_missing_parts() {
        let (mut world, _ring_root) = ring_world();
        world.insert_resource(Messages::<ViewerReadiness>::default());
        world.resource_mut::<AssemblyState>().generation = 1;

        let messages = run_readiness(&mut world);
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].error.as_deref(),
            Some("Both shank and head models could not be loaded.")
        );

        // The failure is terminal and never re-announced.
        assert!(run_readiness(&mut world).is_empty());
        assert!(matches!(
            world.resource::<AssemblyState>().readiness,
            Readiness::Failed(_)
        ));
    }

    #[test]
    fn test_readiness_failure_for_one_part_names_it() {
        let (mut world, ring_root) = ring_world();
        world.insert_resource(Messages::<ViewerReadiness>::default());
        let shank = spawn_part_root(&mut world, ring_root);
        {
            let mut state = world.resource_mut::<AssemblyState>();
            state.generation = 1;
            state.shank.root = Some(shank);
        }

        let messages = run_readiness(&mut world);
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].error.as_deref(),
            Some("Head model could not be loaded.")
        );
    }

    #[test]
    fn test_readiness_waits_for_winning_loads() {
        let (mut world, _ring_root) = ring_world();
        world.insert_resource(Messages::<ViewerReadiness>::default());
        let pending = fake_pending(&mut world, 1, "models/shank-split.glb", Vec::new());
        {
            let mut state = world.resource_mut::<AssemblyState>();
            state.generation = 1;
            state.shank.in_flight.push(pending);
        }

        let messages = run_readiness(&mut world);
        assert!(messages.is_empty());
        assert_eq!(
            world.resource::<AssemblyState>().readiness,
            Readiness::Pending
        );
    }
}

use crate::configurator::camera::UiInteractionState;
use crate::configurator::catalog::RingCatalog;
use crate::configurator::config::{BandMode, ConfigUpdate, MetalColor};
use crate::configurator::sync::{AssemblyState, Readiness};
use bevy::prelude::{MessageWriter, Res, ResMut, Resource};
use bevy_egui::{EguiContexts, egui};

/// What the control panel currently shows. Selections are kept as indices
/// into the catalog's option lists, the way they are laid out on screen.
#[derive(Resource, Debug, Clone)]
pub struct PanelState {
    pub style_idx: usize,
    pub setting_idx: usize,
    pub shape_idx: usize,
    pub metal: MetalColor,
    pub carat: f32,
    pub band_mode: BandMode,
    pub two_tone: bool,
    pub auto_rotate: bool,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            style_idx: 0,
            setting_idx: 0,
            shape_idx: 0,
            metal: MetalColor::White,
            carat: 1.0,
            band_mode: BandMode::None,
            two_tone: false,
            auto_rotate: false,
        }
    }
}

/// Moves an invalid setting or shape selection to the first combination the
/// chosen style supports, in panel layout order.
pub fn corrected_selection(
    catalog: &RingCatalog,
    style_idx: usize,
    setting_idx: usize,
    shape_idx: usize,
) -> (usize, usize) {
    let Some(style) = catalog.shank_styles.get(style_idx) else {
        return (setting_idx, shape_idx);
    };

    let mut setting_idx = setting_idx;
    let setting_ok = catalog
        .head_settings
        .get(setting_idx)
        .is_some_and(|setting| style.settings.iter().any(|id| *id == setting.id));
    if !setting_ok {
        if let Some(first) = catalog.first_available_setting(&style.id) {
            if let Some(idx) = catalog
                .head_settings
                .iter()
                .position(|setting| setting.id == first.id)
            {
                setting_idx = idx;
            }
        }
    }

    let mut shape_idx = shape_idx;
    if let Some(setting) = catalog.head_settings.get(setting_idx) {
        let shape_ok = catalog
            .diamond_shapes
            .get(shape_idx)
            .is_some_and(|shape| catalog.is_combination_available(&style.id, &setting.id, &shape.id));
        if !shape_ok {
            if let Some(first) = catalog.first_available_shape(&style.id, &setting.id) {
                if let Some(idx) = catalog
                    .diamond_shapes
                    .iter()
                    .position(|shape| shape.id == first.id)
                {
                    shape_idx = idx;
                }
            }
        }
    }

    (setting_idx, shape_idx)
}

fn band_token(mode: BandMode) -> String {
    match mode {
        BandMode::None => "0",
        BandMode::Single => "1",
        BandMode::Double => "2",
    }
    .to_string()
}

/// The full configuration the panel currently describes, sent as one event
/// so the synchronizer always sees a consistent snapshot.
pub fn current_update(catalog: &RingCatalog, panel: &PanelState) -> Option<ConfigUpdate> {
    let style = catalog.shank_styles.get(panel.style_idx)?;
    let setting = catalog.head_settings.get(panel.setting_idx)?;
    let shape = catalog.diamond_shapes.get(panel.shape_idx)?;
    let head = catalog.head_asset(&setting.id, &shape.id)?;

    Some(ConfigUpdate {
        shank: Some(style.asset.clone()),
        head: Some(head.to_string()),
        metal_color: Some(panel.metal),
        carat: Some(panel.carat),
        matching_band: Some(band_token(panel.band_mode)),
        two_tone: Some(panel.two_tone && panel.metal != MetalColor::White),
        auto_rotate: Some(panel.auto_rotate),
    })
}

fn carat_range(catalog: &RingCatalog) -> (f32, f32) {
    let min = catalog.carat_options.first().copied().unwrap_or(1.0);
    let max = catalog.carat_options.last().copied().unwrap_or(4.0);
    (min, max.max(min))
}

pub fn ui_system(
    mut contexts: EguiContexts,
    catalog: Res<RingCatalog>,
    state: Res<AssemblyState>,
    mut panel: ResMut<PanelState>,
    mut ui_state: ResMut<UiInteractionState>,
    mut updates: MessageWriter<ConfigUpdate>,
) {
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    panel.style_idx = panel
        .style_idx
        .min(catalog.shank_styles.len().saturating_sub(1));

    egui::TopBottomPanel::top("ring_configurator_top_bar").show(ctx, |ui| {
        ui.horizontal_wrapped(|ui| {
            ui.heading("Ring Configurator");
            ui.separator();
            match &state.readiness {
                Readiness::Pending | Readiness::Settling { .. } => {
                    ui.label("Status: assembling");
                    ui.spinner();
                }
                Readiness::Announced => {
                    ui.label("Status: ready");
                }
                Readiness::Failed(_) => {
                    ui.label("Status: failed");
                }
            }
            ui.separator();
            ui.small("Viewport controls: LMB rotate, wheel zoom.");
        });
    });

    let mut changed = false;

    let side_panel_response = egui::SidePanel::right("ring_configurator_controls")
        .resizable(true)
        .default_width(320.0)
        .show(ctx, |ui| {
            ui.heading("Ring Style");
            for (idx, style) in catalog.shank_styles.iter().enumerate() {
                if ui
                    .selectable_label(panel.style_idx == idx, &style.name)
                    .clicked()
                {
                    panel.style_idx = idx;
                    changed = true;
                }
            }

            let style = &catalog.shank_styles[panel.style_idx];

            ui.separator();
            ui.heading("Setting Style");
            ui.horizontal_wrapped(|ui| {
                for (idx, setting) in catalog.head_settings.iter().enumerate() {
                    let allowed = style.settings.iter().any(|id| *id == setting.id);
                    if ui
                        .add_enabled(
                            allowed,
                            egui::SelectableLabel::new(panel.setting_idx == idx, &setting.name),
                        )
                        .clicked()
                    {
                        panel.setting_idx = idx;
                        changed = true;
                    }
                }
            });

            ui.separator();
            ui.heading("Diamond Shape");
            ui.horizontal_wrapped(|ui| {
                for (idx, shape) in catalog.diamond_shapes.iter().enumerate() {
                    let setting_id = catalog
                        .head_settings
                        .get(panel.setting_idx)
                        .map(|setting| setting.id.as_str())
                        .unwrap_or_default();
                    let available =
                        catalog.is_combination_available(&style.id, setting_id, &shape.id);
                    if ui
                        .add_enabled(
                            available,
                            egui::SelectableLabel::new(panel.shape_idx == idx, &shape.name),
                        )
                        .clicked()
                    {
                        panel.shape_idx = idx;
                        changed = true;
                    }
                }
            });

            ui.separator();
            ui.heading("Metal Color");
            ui.horizontal_wrapped(|ui| {
                for metal in MetalColor::ALL {
                    if ui
                        .selectable_label(panel.metal == metal, metal.label())
                        .clicked()
                    {
                        panel.metal = metal;
                        if metal == MetalColor::White {
                            panel.two_tone = false;
                        }
                        changed = true;
                    }
                }
            });
            let two_tone_response = ui.add_enabled(
                panel.metal != MetalColor::White,
                egui::Checkbox::new(&mut panel.two_tone, "Two-tone (white head)"),
            );
            if two_tone_response.changed() {
                changed = true;
            }

            ui.separator();
            ui.heading("Carat");
            let (carat_min, carat_max) = carat_range(&catalog);
            let carat_response = ui.add(
                egui::Slider::new(&mut panel.carat, carat_min..=carat_max)
                    .text("Carat")
                    .step_by(0.5),
            );
            if carat_response.changed() {
                changed = true;
            }

            ui.separator();
            ui.heading("Matching Band");
            ui.horizontal_wrapped(|ui| {
                for mode in [BandMode::None, BandMode::Single, BandMode::Double] {
                    if ui
                        .selectable_label(panel.band_mode == mode, mode.label())
                        .clicked()
                    {
                        panel.band_mode = mode;
                        changed = true;
                    }
                }
            });

            ui.separator();
            if ui
                .checkbox(&mut panel.auto_rotate, "Auto-rotate camera")
                .changed()
            {
                changed = true;
            }

            ui.separator();
            if ui.button("Reset").clicked() {
                *panel = PanelState::default();
                changed = true;
            }
        });

    if let Readiness::Failed(message) = &state.readiness {
        egui::Window::new("Loading Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
            });
    }

    if changed {
        let (setting_idx, shape_idx) = corrected_selection(
            &catalog,
            panel.style_idx,
            panel.setting_idx,
            panel.shape_idx,
        );
        panel.setting_idx = setting_idx;
        panel.shape_idx = shape_idx;
        if let Some(update) = current_update(&catalog, &panel) {
            updates.write(update);
        }
    }

    ui_state.wants_pointer_input = ctx.wants_pointer_input();
    ui_state.side_panel_width = side_panel_response.response.rect.width();
}

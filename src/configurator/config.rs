use crate::configurator::BASE_HEAD_SCALE;
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetalColor {
    White,
    Yellow,
    Rose,
}

impl MetalColor {
    pub const ALL: [MetalColor; 3] = [MetalColor::White, MetalColor::Rose, MetalColor::Yellow];

    pub fn label(self) -> &'static str {
        match self {
            MetalColor::White => "White Gold",
            MetalColor::Yellow => "Yellow Gold",
            MetalColor::Rose => "Rose Gold",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "white" => Some(MetalColor::White),
            "yellow" => Some(MetalColor::Yellow),
            "rose" => Some(MetalColor::Rose),
            _ => None,
        }
    }

    /// Reference sRGB palette value, converted into the renderer's linear
    /// working space. Materials must never be fed the gamma-encoded form.
    pub fn linear(self) -> LinearRgba {
        let srgb = match self {
            MetalColor::White => Color::srgb_u8(194, 194, 195),
            MetalColor::Yellow => Color::srgb_u8(227, 187, 94),
            MetalColor::Rose => Color::srgb_u8(217, 164, 131),
        };
        srgb.to_linear()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandMode {
    #[default]
    None,
    Single,
    Double,
}

impl BandMode {
    pub fn label(self) -> &'static str {
        match self {
            BandMode::None => "None",
            BandMode::Single => "Band 1",
            BandMode::Double => "Band 2",
        }
    }

    pub fn copies(self) -> usize {
        match self {
            BandMode::None => 0,
            BandMode::Single => 1,
            BandMode::Double => 2,
        }
    }
}

/// Parses the inbound matching-band token: "0"/"1"/"2" select a mode with the
/// catalog band, an asset-looking token selects a custom band in single mode,
/// and anything else disables the feature.
pub fn parse_band_token(token: &str) -> (BandMode, Option<String>) {
    let token = token.trim();
    match token {
        "0" => (BandMode::None, None),
        "1" => (BandMode::Single, None),
        "2" => (BandMode::Double, None),
        _ if token.contains('/') || token.ends_with(".glb") || token.ends_with(".gltf") => {
            (BandMode::Single, Some(token.to_string()))
        }
        _ => (BandMode::None, None),
    }
}

/// One inbound configuration-change event. Every field is optional; an
/// omitted field means "no change" and never resets the current value.
#[derive(Message, Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub shank: Option<String>,
    pub head: Option<String>,
    pub metal_color: Option<MetalColor>,
    pub carat: Option<f32>,
    pub matching_band: Option<String>,
    pub two_tone: Option<bool>,
    pub auto_rotate: Option<bool>,
}

/// Which recomputations an applied update calls for, beyond any asset loads
/// the synchronizer decides to issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigDelta {
    pub layout_changed: bool,
    pub colors_changed: bool,
    pub camera_changed: bool,
}

/// The full desired configuration. Mutated field-by-field by update events
/// and never rolled back; a field keeps its last accepted value even when a
/// later load for it fails.
#[derive(Resource, Debug, Clone)]
pub struct RingConfig {
    pub shank: Option<String>,
    pub head: Option<String>,
    pub metal_color: MetalColor,
    pub carat: f32,
    pub band_mode: BandMode,
    pub band_asset: Option<String>,
    pub two_tone: bool,
    pub auto_rotate: bool,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            shank: None,
            head: None,
            metal_color: MetalColor::White,
            carat: 1.0,
            band_mode: BandMode::None,
            band_asset: None,
            two_tone: false,
            auto_rotate: false,
        }
    }
}

impl RingConfig {
    pub fn apply(&mut self, update: &ConfigUpdate) -> ConfigDelta {
        let mut delta = ConfigDelta::default();

        if let Some(shank) = &update.shank {
            if self.shank.as_deref() != Some(shank.as_str()) {
                self.shank = Some(shank.clone());
            }
        }

        if let Some(head) = &update.head {
            if self.head.as_deref() != Some(head.as_str()) {
                self.head = Some(head.clone());
            }
        }

        if let Some(metal) = update.metal_color {
            if self.metal_color != metal {
                self.metal_color = metal;
                delta.colors_changed = true;
            }
        }

        if let Some(carat) = update.carat {
            if !carat.is_finite() || carat <= 0.0 {
                warn!("ignoring invalid carat value {carat}");
            } else if self.carat != carat {
                self.carat = carat;
                delta.layout_changed = true;
            }
        }

        if let Some(token) = &update.matching_band {
            let (mode, asset) = parse_band_token(token);
            self.band_mode = mode;
            self.band_asset = asset;
        }

        if let Some(two_tone) = update.two_tone {
            if self.two_tone != two_tone {
                self.two_tone = two_tone;
                delta.colors_changed = true;
            }
        }

        if let Some(auto_rotate) = update.auto_rotate {
            if self.auto_rotate != auto_rotate {
                self.auto_rotate = auto_rotate;
                delta.camera_changed = true;
            }
        }

        delta
    }
}

/// Uniform head scale for a carat weight. The sixth root keeps perceived
/// stone growth close to linear in diameter rather than in volume.
pub fn head_scale_for_carat(carat: f32) -> f32 {
    BASE_HEAD_SCALE * carat.powf(1.0 / 6.0)
}

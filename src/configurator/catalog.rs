use bevy::prelude::*;
use serde::Deserialize;
use std::fs;
use thiserror::Error;

/// One selectable shank style, together with the head settings and diamond
/// shapes it may be combined with.
#[derive(Debug, Clone, Deserialize)]
pub struct ShankStyle {
    pub id: String,
    pub name: String,
    pub asset: String,
    pub settings: Vec<String>,
    pub shapes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadSetting {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiamondShape {
    pub id: String,
    pub name: String,
}

/// Maps a (setting, shape) pair to the head model that renders it. Pairs
/// without an entry are not orderable and the panel must not offer them.
#[derive(Debug, Clone, Deserialize)]
pub struct HeadEntry {
    pub setting: String,
    pub shape: String,
    pub asset: String,
}

/// Everything orderable: styles, settings, shapes, the head lookup table and
/// the stock assets. Option lists keep panel layout order, which also decides
/// which entry wins when an invalid combination has to be corrected.
#[derive(Resource, Debug, Clone, Deserialize)]
pub struct RingCatalog {
    pub shank_styles: Vec<ShankStyle>,
    pub head_settings: Vec<HeadSetting>,
    pub diamond_shapes: Vec<DiamondShape>,
    pub heads: Vec<HeadEntry>,
    pub band_asset: String,
    pub default_shank_asset: String,
    pub default_head_asset: String,
    pub carat_options: Vec<f32>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse catalog {path}: {source}")]
    Parse {
        path: String,
        source: ron::error::SpannedError,
    },
    #[error("catalog defines no shank styles")]
    NoStyles,
    #[error("catalog defines no head entries")]
    NoHeads,
}

pub fn load_catalog(path: &str) -> Result<RingCatalog, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_string(),
        source,
    })?;
    let catalog: RingCatalog = ron::de::from_str(&text).map_err(|source| CatalogError::Parse {
        path: path.to_string(),
        source,
    })?;
    if catalog.shank_styles.is_empty() {
        return Err(CatalogError::NoStyles);
    }
    if catalog.heads.is_empty() {
        return Err(CatalogError::NoHeads);
    }
    Ok(catalog)
}

/// Loads the catalog before the app starts, falling back to the built-in
/// one so a missing or broken file never prevents launch.
pub fn load_initial_catalog(path: &str) -> RingCatalog {
    match load_catalog(path) {
        Ok(catalog) => catalog,
        Err(err) => {
            eprintln!("{err}; using the built-in catalog");
            default_ring_catalog()
        }
    }
}

/// Bare model file names refer to the bundled model directory; anything with
/// a path separator is taken verbatim.
pub fn normalize_asset_path(token: &str) -> String {
    if token.contains('/') || token.contains('\\') {
        token.to_string()
    } else {
        format!("models/{token}")
    }
}

impl RingCatalog {
    pub fn style(&self, id: &str) -> Option<&ShankStyle> {
        self.shank_styles.iter().find(|style| style.id == id)
    }

    pub fn head_asset(&self, setting: &str, shape: &str) -> Option<&str> {
        self.heads
            .iter()
            .find(|entry| entry.setting == setting && entry.shape == shape)
            .map(|entry| entry.asset.as_str())
    }

    /// A combination is offerable when the style allows both halves and a
    /// head model actually exists for the pair.
    pub fn is_combination_available(&self, style_id: &str, setting_id: &str, shape_id: &str) -> bool {
        let Some(style) = self.style(style_id) else {
            return false;
        };
        style.settings.iter().any(|id| id == setting_id)
            && style.shapes.iter().any(|id| id == shape_id)
            && self.head_asset(setting_id, shape_id).is_some()
    }

    pub fn first_available_setting(&self, style_id: &str) -> Option<&HeadSetting> {
        let style = self.style(style_id)?;
        self.head_settings
            .iter()
            .find(|setting| style.settings.iter().any(|id| *id == setting.id))
    }

    pub fn first_available_shape(&self, style_id: &str, setting_id: &str) -> Option<&DiamondShape> {
        self.diamond_shapes
            .iter()
            .find(|shape| self.is_combination_available(style_id, setting_id, &shape.id))
    }

    /// Resolves a shank token, which is either a style id from the catalog or
    /// a model path given directly.
    pub fn shank_asset_for(&self, token: &str) -> String {
        match self.style(token) {
            Some(style) => style.asset.clone(),
            None => normalize_asset_path(token),
        }
    }
}

pub fn default_ring_catalog() -> RingCatalog {
    let setting_ids = ["hidden-halo", "basket-set"];
    let shape_rows = [
        ("asscher", "Asscher"),
        ("heart", "Heart"),
        ("oval", "Oval"),
        ("cushion", "Cushion"),
        ("emerald", "Emerald"),
        ("marquise", "Marquise"),
        ("pear", "Pear"),
        ("princess", "Princess"),
        ("radiant", "Radiant"),
        ("round", "Round"),
    ];
    let style_rows = [
        ("solitaire", "Solitaire Shank"),
        ("pave-three-row", "3-row Pave Diamond"),
        ("double-row", "Double Row Diamond"),
        ("split", "Split"),
        ("garden", "Garden"),
        ("single-row", "Single Row Diamond"),
        ("twist", "Twist"),
    ];

    let all_settings: Vec<String> = setting_ids.iter().map(|id| id.to_string()).collect();
    let all_shapes: Vec<String> = shape_rows.iter().map(|(id, _)| id.to_string()).collect();

    let shank_styles = style_rows
        .iter()
        .map(|(id, name)| ShankStyle {
            id: id.to_string(),
            name: name.to_string(),
            asset: format!("models/shank-{id}.glb"),
            settings: all_settings.clone(),
            shapes: all_shapes.clone(),
        })
        .collect();

    let head_settings = vec![
        HeadSetting {
            id: "hidden-halo".to_string(),
            name: "Hidden Halo".to_string(),
        },
        HeadSetting {
            id: "basket-set".to_string(),
            name: "Basket Set".to_string(),
        },
    ];

    let diamond_shapes = shape_rows
        .iter()
        .map(|(id, name)| DiamondShape {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect();

    let mut heads: Vec<HeadEntry> = all_shapes
        .iter()
        .map(|shape| HeadEntry {
            setting: "hidden-halo".to_string(),
            shape: shape.clone(),
            asset: format!("models/head-hidden-halo-{shape}.glb"),
        })
        .collect();
    heads.push(HeadEntry {
        setting: "basket-set".to_string(),
        shape: "oval".to_string(),
        asset: "models/head-basket-set-oval.glb".to_string(),
    });

    RingCatalog {
        shank_styles,
        head_settings,
        diamond_shapes,
        heads,
        band_asset: "models/matching-band.glb".to_string(),
        default_shank_asset: "models/shank-i-jewel.glb".to_string(),
        default_head_asset: "models/head-i-jewel.glb".to_string(),
        carat_options: vec![1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0],
    }
}

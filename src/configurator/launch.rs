use crate::configurator::CATALOG_PATH;
use crate::configurator::catalog::RingCatalog;
use crate::configurator::config::{BandMode, ConfigUpdate, MetalColor, parse_band_token};
use crate::configurator::ui::{PanelState, corrected_selection, current_update};
use std::env;

#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub catalog_path: String,
    pub shank: Option<String>,
    pub setting: Option<String>,
    pub shape: Option<String>,
    pub metal: Option<String>,
    pub carat: Option<f32>,
    pub band: Option<String>,
    pub two_tone: bool,
    pub auto_rotate: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            catalog_path: CATALOG_PATH.to_string(),
            shank: None,
            setting: None,
            shape: None,
            metal: None,
            carat: None,
            band: None,
            two_tone: false,
            auto_rotate: false,
        }
    }
}

pub fn parse_launch_options() -> LaunchOptions {
    let mut options = LaunchOptions::default();
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--shank" => {
                let Some(value) = args.next() else {
                    eprintln!("--shank expects a style id or model path");
                    print_cli_help_and_exit(2);
                };
                options.shank = Some(value);
            }
            "--setting" => {
                let Some(value) = args.next() else {
                    eprintln!("--setting expects a setting id");
                    print_cli_help_and_exit(2);
                };
                options.setting = Some(value);
            }
            "--shape" => {
                let Some(value) = args.next() else {
                    eprintln!("--shape expects a shape id");
                    print_cli_help_and_exit(2);
                };
                options.shape = Some(value);
            }
            "--metal" => {
                let Some(value) = args.next() else {
                    eprintln!("--metal expects white, rose or yellow");
                    print_cli_help_and_exit(2);
                };
                options.metal = Some(value);
            }
            "--carat" => {
                let Some(value) = args.next() else {
                    eprintln!("--carat expects a number");
                    print_cli_help_and_exit(2);
                };
                match value.parse::<f32>() {
                    Ok(carat) => options.carat = Some(carat),
                    Err(_) => {
                        eprintln!("--carat expects a number, got '{value}'");
                        print_cli_help_and_exit(2);
                    }
                }
            }
            "--band" => {
                let Some(value) = args.next() else {
                    eprintln!("--band expects 0, 1, 2 or a model path");
                    print_cli_help_and_exit(2);
                };
                options.band = Some(value);
            }
            "--two-tone" => options.two_tone = true,
            "--auto-rotate" => options.auto_rotate = true,
            "--catalog" => {
                let Some(value) = args.next() else {
                    eprintln!("--catalog expects a path");
                    print_cli_help_and_exit(2);
                };
                options.catalog_path = value;
            }
            "--help" | "-h" => {
                print_cli_help_and_exit(0);
            }
            _ => {
                eprintln!("Unknown option: {arg}");
                print_cli_help_and_exit(2);
            }
        }
    }

    options
}

pub fn print_cli_help_and_exit(code: i32) -> ! {
    println!(
        "Usage:\n  ringsmith [options]\n\nOptions:\n      --shank <id|path>   Shank style id or glTF model path\n      --setting <id>      Head setting id\n      --shape <id>        Diamond shape id\n      --metal <color>     Metal color: white, rose or yellow\n      --carat <weight>    Center stone carat weight\n      --band <mode|path>  Matching band: 0, 1, 2 or a glTF model path\n      --two-tone          Keep the head white gold\n      --auto-rotate       Spin the camera until the user drags\n      --catalog <path>    Ring catalog file (RON)\n  -h, --help              Show this help"
    );
    std::process::exit(code);
}

/// Turns launch options into the first configuration event and the matching
/// panel selection. Unknown ids fall back to defaults, and invalid
/// setting/shape combinations are corrected the same way the panel corrects
/// them.
pub fn resolve_initial(
    options: &LaunchOptions,
    catalog: &RingCatalog,
) -> (ConfigUpdate, PanelState) {
    let mut panel = PanelState::default();

    if let Some(token) = &options.shank {
        if let Some(idx) = catalog
            .shank_styles
            .iter()
            .position(|style| style.id == *token)
        {
            panel.style_idx = idx;
        }
    }
    if let Some(token) = &options.setting {
        if let Some(idx) = catalog
            .head_settings
            .iter()
            .position(|setting| setting.id == *token)
        {
            panel.setting_idx = idx;
        }
    }
    if let Some(token) = &options.shape {
        if let Some(idx) = catalog
            .diamond_shapes
            .iter()
            .position(|shape| shape.id == *token)
        {
            panel.shape_idx = idx;
        }
    }
    let (setting_idx, shape_idx) = corrected_selection(
        catalog,
        panel.style_idx,
        panel.setting_idx,
        panel.shape_idx,
    );
    panel.setting_idx = setting_idx;
    panel.shape_idx = shape_idx;

    if let Some(token) = &options.metal {
        match MetalColor::parse(token) {
            Some(metal) => panel.metal = metal,
            None => eprintln!("unknown metal color '{token}', using white gold"),
        }
    }
    if let Some(carat) = options.carat {
        if carat.is_finite() && carat > 0.0 {
            panel.carat = carat;
        } else {
            eprintln!("ignoring invalid carat weight {carat}");
        }
    }

    let band_asset = match &options.band {
        Some(token) => {
            let (mode, asset) = parse_band_token(token);
            panel.band_mode = mode;
            asset
        }
        None => None,
    };
    panel.two_tone = options.two_tone && panel.metal != MetalColor::White;
    panel.auto_rotate = options.auto_rotate;

    let mut update = match current_update(catalog, &panel) {
        Some(update) => update,
        None => ConfigUpdate {
            shank: Some(catalog.default_shank_asset.clone()),
            head: Some(catalog.default_head_asset.clone()),
            metal_color: Some(panel.metal),
            carat: Some(panel.carat),
            matching_band: None,
            two_tone: Some(panel.two_tone),
            auto_rotate: Some(panel.auto_rotate),
        },
    };

    // A shank token that is not a style id is a model path given directly.
    if let Some(token) = &options.shank {
        if catalog.style(token).is_none() {
            update.shank = Some(catalog.shank_asset_for(token));
        }
    }
    // Custom band assets ride along as the raw token; the configuration
    // layer parses it back into single-band mode with that model.
    if let Some(asset) = band_asset {
        update.matching_band = Some(asset);
    }

    (update, panel)
}

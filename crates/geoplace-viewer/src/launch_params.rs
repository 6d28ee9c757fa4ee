//! Launch parameter parsing for the viewer.
//!
//! On native, parameters are parsed from command-line arguments using clap and
//! fall back to the `GEOPLACE_*` environment variables. On WASM, they are read
//! from the page's query string.

use bevy::prelude::*;
use geoplace::config::Config;
use geoplace::scene::CameraMode;
use geoplace::state::{VIEW_DISTANCE_RANGE, clamp_zoom};

/// Launch parameters for the viewer.
#[derive(Resource, Debug, Clone)]
pub struct LaunchParams {
    pub config: Config,
    /// Initial camera interaction mode.
    pub camera_mode: CameraMode,
    /// Initial zoom level, already clamped.
    pub zoom: f64,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            config: Config::default(),
            camera_mode: CameraMode::default(),
            zoom: VIEW_DISTANCE_RANGE.default,
        }
    }
}

/// Build launch parameters from `key=value` pairs of a URL query string.
///
/// Recognised keys are `google_maps_api_key`, `mapbox_access_token`,
/// `auto_center_tileset`, `mode` (`orbit` or `free`) and `zoom`.
#[cfg_attr(not(target_family = "wasm"), allow(dead_code))]
pub fn from_query(query: &str) -> LaunchParams {
    let mut google = None;
    let mut mapbox = None;
    let mut auto_center = false;
    let mut params = LaunchParams::default();

    for pair in query.trim_start_matches('?').split('&') {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = urlencoding::decode(value).map_or_else(|_| value.to_string(), |v| v.into_owned());
        match name {
            "google_maps_api_key" => google = Some(value),
            "mapbox_access_token" => mapbox = Some(value),
            "auto_center_tileset" => auto_center = value == "true",
            "mode" => {
                if let Some(mode) = parse_camera_mode(&value) {
                    params.camera_mode = mode;
                }
            }
            "zoom" => {
                if let Ok(zoom) = value.parse::<f64>() {
                    params.zoom = clamp_zoom(zoom);
                }
            }
            _ => {}
        }
    }

    params.config = Config::new(google, mapbox, auto_center);
    params
}

fn parse_camera_mode(value: &str) -> Option<CameraMode> {
    match value.to_ascii_lowercase().as_str() {
        "orbit" => Some(CameraMode::Orbit),
        "free" => Some(CameraMode::Free),
        _ => None,
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::{Parser, ValueEnum};

    use super::*;

    #[derive(Clone, Copy, Debug, Default, ValueEnum)]
    enum ModeArg {
        #[default]
        Orbit,
        Free,
    }

    impl From<ModeArg> for CameraMode {
        fn from(mode: ModeArg) -> Self {
            match mode {
                ModeArg::Orbit => CameraMode::Orbit,
                ModeArg::Free => CameraMode::Free,
            }
        }
    }

    #[derive(Parser)]
    #[command(about = "Place a 3D model on Google photorealistic 3D tiles")]
    struct CliArgs {
        /// Google Maps Platform key [default: $GEOPLACE_GOOGLE_MAPS_API_KEY].
        #[arg(long)]
        google_maps_api_key: Option<String>,

        /// Mapbox access token [default: $GEOPLACE_MAPBOX_ACCESS_TOKEN].
        #[arg(long)]
        mapbox_access_token: Option<String>,

        /// Recentre on the tileset's location once it loads.
        #[arg(long)]
        auto_center_tileset: bool,

        /// Initial camera mode.
        #[arg(long, value_enum, default_value_t = ModeArg::default())]
        mode: ModeArg,

        /// Initial zoom level.
        #[arg(long, default_value_t = VIEW_DISTANCE_RANGE.default)]
        zoom: f64,
    }

    pub fn parse() -> LaunchParams {
        let args = CliArgs::parse();
        let env = Config::from_env();
        LaunchParams {
            config: Config::new(
                args.google_maps_api_key.or(env.google_maps_api_key),
                args.mapbox_access_token.or(env.mapbox_access_token),
                args.auto_center_tileset || env.auto_center_tileset,
            ),
            camera_mode: args.mode.into(),
            zoom: clamp_zoom(args.zoom),
        }
    }
}

#[cfg(target_family = "wasm")]
mod wasm {
    use wasm_bindgen::JsValue;

    /// The `location.search` of the hosting page.
    pub fn query_string() -> Option<String> {
        let global = js_sys::global();
        let location = js_sys::Reflect::get(&global, &JsValue::from_str("location")).ok()?;
        js_sys::Reflect::get(&location, &JsValue::from_str("search"))
            .ok()?
            .as_string()
    }
}

/// Parse launch parameters from CLI args (native) or the page URL (WASM).
pub fn parse() -> LaunchParams {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        wasm::query_string().map_or_else(LaunchParams::default, |query| from_query(&query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_parsing() {
        let params = from_query(
            "?google_maps_api_key=%20abc%20&mapbox_access_token=pk.1&auto_center_tileset=true&mode=Free&zoom=30",
        );
        assert_eq!(params.config.google_maps_api_key.as_deref(), Some("abc"));
        assert_eq!(params.config.mapbox_access_token.as_deref(), Some("pk.1"));
        assert!(params.config.auto_center_tileset);
        assert_eq!(params.camera_mode, CameraMode::Free);
        assert!((params.zoom - 22.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_query_defaults() {
        let params = from_query("");
        assert_eq!(params.config, Config::default());
        assert_eq!(params.camera_mode, CameraMode::Orbit);
        assert!((params.zoom - VIEW_DISTANCE_RANGE.default).abs() < f64::EPSILON);

        let params = from_query("mode=sideways&zoom=abc&auto_center_tileset=1");
        assert_eq!(params.camera_mode, CameraMode::Orbit);
        assert!(!params.config.auto_center_tileset);
    }
}

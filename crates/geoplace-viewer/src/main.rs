//! Place a glTF, GLB or OBJ model on Google photorealistic 3D tiles.
//!
//! The viewer hosts the `geoplace` controller inside Bevy: window input becomes
//! controller messages, controller effects run as Bevy systems and background
//! tasks, and the renderer state the scene coordinator produces is mirrored
//! into the camera, the placed model and the tile layer.

mod async_runtime;
mod camera;
mod controller;
mod effects;
mod floating_origin;
mod input;
mod launch_params;
mod model;
mod picking;
mod renderer;
mod tiles;
mod ui;

use async_runtime::AsyncRuntimePlugin;
use bevy::prelude::*;
use camera::CameraControllerPlugin;
use controller::ControllerPlugin;
use effects::EffectsPlugin;
use floating_origin::FloatingOriginPlugin;
use input::KeyboardInputPlugin;
use model::ModelPlugin;
use picking::PickingPlugin;
use tiles::TilesPlugin;
use ui::UiPlugin;

/// Plugin for the main application.
pub struct AppPlugin;

impl Plugin for AppPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ClearColor(Color::srgb(0.05, 0.07, 0.1)))
            .add_plugins((
                ControllerPlugin,
                FloatingOriginPlugin,
                CameraControllerPlugin,
                PickingPlugin,
                KeyboardInputPlugin,
                EffectsPlugin,
                TilesPlugin,
                ModelPlugin,
                UiPlugin,
            ));
    }
}

fn main() {
    // Initialize tracing for native platforms.
    #[cfg(not(target_family = "wasm"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Initialize tracing for WASM (logs to browser console).
    #[cfg(target_family = "wasm")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    let params = launch_params::parse();
    if params.config.google_maps_api_key.is_none() {
        tracing::warn!(
            "No Google Maps API key configured, the basemap will not stream \
             (set {} or pass --google-maps-api-key)",
            geoplace::config::GOOGLE_MAPS_API_KEY_VAR
        );
    }

    let mut app = App::new();

    #[allow(unused_mut)]
    let mut window = Window {
        title: "geoplace".to_string(),
        resolution: (1280, 720).into(),
        position: WindowPosition::Centered(MonitorSelection::Primary),
        ..Default::default()
    };

    // WASM: Fit canvas to parent element and prevent browser event handling.
    #[cfg(target_family = "wasm")]
    {
        window.fit_canvas_to_parent = true;
        window.prevent_default_event_handling = true;
    }

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(window),
        ..Default::default()
    }));

    // Add async runtime (Tokio on native, no-op on WASM).
    app.add_plugins(AsyncRuntimePlugin);

    // The controller plugin reads these while building.
    app.insert_resource(params);

    app.add_plugins(AppPlugin).run();
}

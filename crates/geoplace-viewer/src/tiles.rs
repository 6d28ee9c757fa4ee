//! The photorealistic tile layer.
//!
//! Fetches the root manifest whenever the tile layer changes and reports the
//! outcome back to the coordinator. A flat ground plane at the ellipsoid stands
//! in for the streamed surface and gives the camera something to hit-test.

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use geoplace::Message;
use geoplace::geodesy::camera_distance;
use geoplace::providers::GOOGLE_API_KEY_HEADER;
use geoplace::providers::tileset::tileset_info;
use geoplace::scene::{RendererEvent, TileLayer};

use crate::async_runtime::TaskSpawner;
use crate::controller::{AppController, Inbox, ViewerSet};
use crate::effects::Providers;

/// Ground plane size relative to the camera distance.
const GROUND_EXTENT: f32 = 40.0;

pub struct TilesPlugin;

impl Plugin for TilesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TileStream>()
            .add_systems(Startup, spawn_ground)
            .add_systems(
                Update,
                (sync_tile_layer, scale_ground).in_set(ViewerSet::Sync),
            );
    }
}

/// Root URL the current manifest was requested from.
#[derive(Resource, Default, Debug)]
struct TileStream {
    url: Option<String>,
    revision: u64,
}

#[derive(Component)]
pub struct GroundPlane;

/// Last path segment of a tile URL, without the query string.
pub fn tile_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

fn layer_key(layer: &TileLayer) -> Option<String> {
    layer
        .headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(GOOGLE_API_KEY_HEADER))
        .map(|(_, value)| value.clone())
}

#[allow(clippy::needless_pass_by_value)]
fn sync_tile_layer(
    controller: Res<AppController>,
    inbox: Res<Inbox>,
    providers: Res<Providers>,
    spawner: TaskSpawner,
    mut stream: ResMut<TileStream>,
) {
    let renderer = controller.renderer();
    if renderer.layers_revision() == stream.revision {
        return;
    }
    stream.revision = renderer.layers_revision();

    let Some(layer) = renderer.layers().tiles.as_ref() else {
        if stream.url.take().is_some() {
            tracing::info!("Tile layer removed");
        }
        return;
    };
    if stream.url.as_deref() == Some(layer.url.as_str()) {
        return;
    }
    stream.url = Some(layer.url.clone());

    tracing::info!("Loading photorealistic tileset");
    let client = providers.0.clone();
    let url = layer.url.clone();
    let key = layer_key(layer);
    let tx = inbox.sender();

    spawner.spawn(async move {
        let messages = match client.fetch_tileset_at(&url, key.as_deref()).await {
            Ok(manifest) => {
                let info = tileset_info(&manifest);
                tracing::info!(center = ?info.center, zoom = ?info.zoom, "Tileset loaded");
                vec![
                    RendererEvent::TilesetLoaded(info),
                    RendererEvent::TileLoaded(tile_name(&url).to_string()),
                ]
            }
            Err(e) => {
                tracing::error!("Failed to load tileset: {e}");
                vec![RendererEvent::TileError(e.to_string())]
            }
        };
        for event in messages {
            let _ = tx.send(Message::Renderer(event)).await;
        }
    });
}

fn spawn_ground(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(1.0, 1.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.32, 0.36, 0.3),
            perceptual_roughness: 1.0,
            ..Default::default()
        })),
        Transform::default(),
        GroundPlane,
    ));
}

/// Keep the ground plane comfortably past the horizon.
#[allow(clippy::needless_pass_by_value)]
fn scale_ground(
    controller: Res<AppController>,
    window: Single<&Window, With<PrimaryWindow>>,
    mut ground: Single<&mut Transform, With<GroundPlane>>,
) {
    let view = controller.renderer().view_state();
    let distance = camera_distance(view.latitude, view.zoom, f64::from(window.height())) as f32;
    let extent = (distance * GROUND_EXTENT).max(1.0);
    ground.scale = Vec3::new(extent, 1.0, extent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_name() {
        assert_eq!(
            tile_name("https://tile.googleapis.com/v1/3dtiles/root.json?key=abc"),
            "root.json"
        );
        assert_eq!(tile_name("root.json#frag"), "root.json");
        assert_eq!(tile_name(""), "");
    }

    #[test]
    fn test_layer_key_from_headers() {
        let layer = TileLayer::google("secret");
        assert_eq!(layer_key(&layer).as_deref(), Some("secret"));

        let bare = TileLayer {
            headers: Vec::new(),
            ..layer
        };
        assert_eq!(layer_key(&bare), None);
    }
}

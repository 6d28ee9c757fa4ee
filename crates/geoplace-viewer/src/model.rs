//! The placed model as Bevy entities.
//!
//! The renderer records a [`ModelLayer`] whenever the coordinator re-registers
//! the model. This module mirrors that layer into a single anchored root entity
//! with one child per mesh part. Decoded geometry is reused while the package
//! bytes stay the same, so transform edits only touch the root.

use std::sync::Arc;

use bevy::asset::RenderAssetUsages;
use bevy::mesh::{Indices, PrimitiveTopology};
use bevy::prelude::*;
use geoplace::Message;
use geoplace::geodesy::LatLngAlt;
use geoplace::mesh::{MeshPart, ModelGroup, decode_package};
use geoplace::scene::{ModelLayer, RendererEvent};

use crate::controller::{AppController, Inbox, ViewerSet};
use crate::floating_origin::GeoAnchor;
use crate::picking::PickSphere;

pub struct ModelPlugin;

impl Plugin for ModelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PlacedModel>()
            .add_systems(Update, sync_model.in_set(ViewerSet::Sync));
    }
}

/// Root entity of the placed model.
#[derive(Component)]
pub struct ModelRoot;

/// Bookkeeping for the spawned model.
#[derive(Resource, Default)]
struct PlacedModel {
    entity: Option<Entity>,
    /// Package bytes the entity was built from.
    source: Option<Arc<[u8]>>,
    revision: u64,
}

/// Local transform of the model root: heading about up, then pitch.
///
/// Heading is clockwise from north, so it turns about `-Y`.
pub fn layer_transform(layer: &ModelLayer) -> Transform {
    let [pitch, _, heading] = layer.orientation;
    let rotation = Quat::from_rotation_y(-(heading.to_radians() as f32))
        * Quat::from_rotation_x(pitch.to_radians() as f32);
    Transform::from_rotation(rotation).with_scale(Vec3::splat(layer.size_scale as f32))
}

fn layer_anchor(layer: &ModelLayer) -> GeoAnchor {
    let [lng, lat, alt] = layer.position;
    GeoAnchor(LatLngAlt::new(lat, lng, alt))
}

/// Convert one decoded part into a Bevy mesh.
fn part_mesh(part: &MeshPart) -> Mesh {
    let mut part = part.clone();
    part.ensure_normals();

    let positions: Vec<[f32; 3]> = part.positions.iter().map(|p| p.to_array()).collect();
    let normals: Vec<[f32; 3]> = part.normals.iter().map(|n| n.to_array()).collect();

    let mut mesh = Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    );
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_indices(Indices::U32(part.indices));
    mesh
}

/// Bounding sphere of a decoded group in root-local space.
fn group_sphere(group: &ModelGroup) -> PickSphere {
    let bounds = group.bounds();
    if bounds.is_empty() {
        return PickSphere {
            center: Vec3::ZERO,
            radius: 0.0,
        };
    }
    PickSphere {
        center: Vec3::from_array(bounds.center().to_array()),
        radius: bounds.size().length() * 0.5,
    }
}

#[allow(clippy::too_many_arguments, clippy::needless_pass_by_value)]
fn sync_model(
    mut commands: Commands,
    controller: Res<AppController>,
    inbox: Res<Inbox>,
    mut placed: ResMut<PlacedModel>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut roots: Query<(&mut Transform, &mut GeoAnchor), With<ModelRoot>>,
) {
    let renderer = controller.renderer();
    if renderer.layers_revision() == placed.revision {
        return;
    }
    placed.revision = renderer.layers_revision();

    let layer = renderer.layers().model.as_ref();
    let package = layer.and_then(|layer| renderer.scene(layer.scene));
    let (Some(layer), Some(package)) = (layer, package) else {
        if let Some(entity) = placed.entity.take() {
            commands.entity(entity).despawn();
            tracing::debug!("Removed model entity");
        }
        placed.source = None;
        return;
    };

    let unchanged = placed
        .source
        .as_ref()
        .is_some_and(|source| Arc::ptr_eq(source, &package.bytes));
    if unchanged
        && let Some(entity) = placed.entity
        && let Ok((mut transform, mut anchor)) = roots.get_mut(entity)
    {
        let next = layer_transform(layer);
        transform.rotation = next.rotation;
        transform.scale = next.scale;
        *anchor = layer_anchor(layer);
        return;
    }

    let group = match decode_package(package) {
        Ok(group) => group,
        Err(e) => {
            tracing::error!("Failed to decode model package: {e}");
            inbox.send(Message::Renderer(RendererEvent::ModelError(e.to_string())));
            return;
        }
    };

    if let Some(entity) = placed.entity.take() {
        commands.entity(entity).despawn();
    }

    let part_transform = Transform::from_translation(Vec3::from_array(
        group.transform.translation.to_array(),
    ))
    .with_scale(Vec3::splat(group.transform.scale));

    let root = commands
        .spawn((
            ModelRoot,
            layer_transform(layer),
            layer_anchor(layer),
            group_sphere(&group),
            Visibility::default(),
        ))
        .with_children(|parent| {
            for part in &group.parts {
                let [r, g, b, a] = part.base_color;
                let material = materials.add(StandardMaterial {
                    base_color: Color::linear_rgba(r, g, b, a),
                    alpha_mode: if a < 1.0 {
                        AlphaMode::Blend
                    } else {
                        AlphaMode::Opaque
                    },
                    double_sided: true,
                    cull_mode: None,
                    ..Default::default()
                });
                parent.spawn((
                    Mesh3d(meshes.add(part_mesh(part))),
                    MeshMaterial3d(material),
                    part_transform,
                ));
            }
        })
        .id();

    tracing::info!(
        parts = group.parts.len(),
        triangles = group.triangle_count(),
        "Spawned model entity"
    );
    placed.entity = Some(root);
    placed.source = Some(Arc::clone(&package.bytes));
}

#[cfg(test)]
mod tests {
    use geoplace::scene::{MODEL_LAYER_ID, SceneHandle};

    use super::*;

    fn layer(heading: f64, pitch: f64, size_scale: f64) -> ModelLayer {
        ModelLayer {
            id: MODEL_LAYER_ID,
            scene: SceneHandle(1),
            position: [-122.4, 37.8, 12.0],
            orientation: [pitch, 0.0, heading],
            size_scale,
            animation_speed: 0.0,
            pickable: true,
        }
    }

    #[test]
    fn test_heading_turns_clockwise_from_north() {
        let transform = layer_transform(&layer(90.0, 0.0, 1.0));
        // Model "forward" (north, -Z) ends up pointing east (+X).
        let facing = transform.rotation * Vec3::NEG_Z;
        assert!((facing - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_size_scale_is_uniform() {
        let transform = layer_transform(&layer(0.0, 0.0, 2.5));
        assert_eq!(transform.scale, Vec3::splat(2.5));
        assert_eq!(transform.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_anchor_swaps_lng_lat() {
        let anchor = layer_anchor(&layer(0.0, 0.0, 1.0));
        assert!((anchor.0.lat - 37.8).abs() < f64::EPSILON);
        assert!((anchor.0.lng + 122.4).abs() < f64::EPSILON);
        assert!((anchor.0.alt - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_part_mesh_fills_normals() {
        let part = MeshPart::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Z],
            vec![0, 1, 2],
        );
        let mesh = part_mesh(&part);
        assert_eq!(mesh.count_vertices(), 3);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
        assert_eq!(mesh.indices().map(Indices::len), Some(3));
    }
}

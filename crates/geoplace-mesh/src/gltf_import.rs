//! glTF / GLB import.
//!
//! Node transforms are baked into part positions so that the resulting
//! [`ModelGroup`] is a flat list of world-space triangle lists.

use std::path::Path;

use glam::{Mat3, Mat4, Vec3};
use gltf::mesh::Mode;

use crate::error::{MeshError, MeshResult};
use crate::group::{MeshPart, ModelGroup};

/// Import a glTF JSON document or GLB container.
///
/// Embedded (`data:`) buffers and the GLB binary chunk are always resolved.
/// Sidecar `.bin` files are resolved relative to `base_dir` when one is given.
pub fn import_gltf(bytes: &[u8], base_dir: Option<&Path>) -> MeshResult<ModelGroup> {
    let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
    let buffers = gltf::import_buffers(&document, base_dir, blob)?;

    let mut parts = Vec::new();
    match document
        .default_scene()
        .or_else(|| document.scenes().next())
    {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(&node, Mat4::IDENTITY, &buffers, &mut parts);
            }
        }
        None => {
            for mesh in document.meshes() {
                collect_mesh(&mesh, Mat4::IDENTITY, &buffers, &mut parts);
            }
        }
    }

    if parts.iter().all(|part| part.indices.is_empty()) {
        return Err(MeshError::Empty);
    }

    tracing::debug!(
        parts = parts.len(),
        buffers = buffers.len(),
        "Imported glTF document"
    );
    Ok(ModelGroup::new(parts))
}

fn collect_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    parts: &mut Vec<MeshPart>,
) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        collect_mesh(&mesh, world, buffers, parts);
    }
    for child in node.children() {
        collect_node(&child, world, buffers, parts);
    }
}

fn collect_mesh(
    mesh: &gltf::Mesh<'_>,
    world: Mat4,
    buffers: &[gltf::buffer::Data],
    parts: &mut Vec<MeshPart>,
) {
    let normal_matrix = normal_matrix(world);
    let flip_winding = world.determinant() < 0.0;

    for primitive in mesh.primitives() {
        if primitive.mode() != Mode::Triangles {
            tracing::debug!(mode = ?primitive.mode(), "Skipping non-triangle primitive");
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

        let Some(positions) = reader.read_positions() else {
            continue;
        };
        let positions: Vec<Vec3> = positions
            .map(|p| world.transform_point3(Vec3::from(p)))
            .collect();

        let normals: Vec<Vec3> = reader
            .read_normals()
            .map(|normals| {
                normals
                    .map(|n| (normal_matrix * Vec3::from(n)).normalize_or(Vec3::Y))
                    .collect()
            })
            .unwrap_or_default();

        let mut indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..u32::try_from(positions.len()).unwrap_or(u32::MAX)).collect(),
        };
        indices.truncate(indices.len() - indices.len() % 3);
        if flip_winding {
            for tri in indices.chunks_exact_mut(3) {
                tri.swap(1, 2);
            }
        }

        let mut part = MeshPart::new(positions, indices);
        part.name = mesh.name().map(str::to_owned);
        part.normals = normals;
        part.base_color = primitive
            .material()
            .pbr_metallic_roughness()
            .base_color_factor();
        part.ensure_normals();
        parts.push(part);
    }
}

fn normal_matrix(world: Mat4) -> Mat3 {
    let linear = Mat3::from_mat4(world);
    if linear.determinant().abs() <= f32::EPSILON {
        Mat3::IDENTITY
    } else {
        linear.inverse().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    fn triangle_gltf(node: &str) -> Vec<u8> {
        let mut buffer = Vec::new();
        for value in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            buffer.extend_from_slice(&value.to_le_bytes());
        }
        let uri = format!(
            "data:application/octet-stream;base64,{}",
            STANDARD.encode(&buffer)
        );
        format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "nodes": [0] }}],
  "nodes": [{node}],
  "meshes": [{{ "name": "tri", "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "material": 0 }}] }}],
  "materials": [{{ "pbrMetallicRoughness": {{ "baseColorFactor": [0.5, 0.25, 1.0, 1.0] }} }}],
  "accessors": [{{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [1, 1, 0] }}],
  "bufferViews": [{{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }}],
  "buffers": [{{ "uri": "{uri}", "byteLength": 36 }}]
}}"#
        )
        .into_bytes()
    }

    #[test]
    fn test_import_embedded_triangle() {
        let group = import_gltf(&triangle_gltf(r#"{ "mesh": 0 }"#), None).unwrap();
        assert_eq!(group.parts.len(), 1);

        let part = &group.parts[0];
        assert_eq!(part.name.as_deref(), Some("tri"));
        assert_eq!(part.indices, vec![0, 1, 2]);
        assert_eq!(part.positions[1], Vec3::X);
        assert_eq!(part.base_color, [0.5, 0.25, 1.0, 1.0]);
        assert_eq!(part.normals.len(), 3);
        assert!((part.normals[0].z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_import_bakes_node_transforms() {
        let node = r#"{ "mesh": 0, "translation": [10, 0, 0], "scale": [2, 2, 2] }"#;
        let group = import_gltf(&triangle_gltf(node), None).unwrap();

        let part = &group.parts[0];
        assert_eq!(part.positions[0], Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(part.positions[1], Vec3::new(12.0, 0.0, 0.0));
        assert_eq!(part.positions[2], Vec3::new(10.0, 2.0, 0.0));
    }

    #[test]
    fn test_import_mirrored_node_flips_winding() {
        let node = r#"{ "mesh": 0, "scale": [-1, 1, 1] }"#;
        let group = import_gltf(&triangle_gltf(node), None).unwrap();
        assert_eq!(group.parts[0].indices, vec![0, 2, 1]);
    }

    #[test]
    fn test_import_rejects_garbage() {
        let err = import_gltf(b"definitely not gltf", None).unwrap_err();
        assert!(matches!(err, MeshError::Gltf { .. }));
    }

    #[test]
    fn test_import_without_meshes_is_empty() {
        let json = br#"{ "asset": { "version": "2.0" }, "scenes": [{ "nodes": [] }] }"#;
        assert_eq!(import_gltf(json, None).unwrap_err(), MeshError::Empty);
    }
}

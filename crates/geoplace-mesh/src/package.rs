//! Portable scene packages handed to the renderer.
//!
//! A package is a self-contained glTF document (binary GLB, or JSON with the
//! buffer embedded as a `data:` URI). The normalization pivot is baked into
//! the exported positions; the normalization scale is not, so the renderer
//! applies it as the model's size.

use std::borrow::Cow;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use glam::Vec3;
use gltf::binary::{Glb, Header};
use serde_json::{Value, json};

use crate::bounds::Aabb;
use crate::error::{MeshError, MeshResult};
use crate::gltf_import::import_gltf;
use crate::group::ModelGroup;

const COMPONENT_FLOAT: u32 = 5126;
const COMPONENT_UNSIGNED_INT: u32 = 5125;
const TARGET_ARRAY_BUFFER: u32 = 34962;
const TARGET_ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// Encoding of a [`ScenePackage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageFormat {
    /// GLB container.
    Binary,
    /// glTF JSON with an embedded base64 buffer.
    Json,
}

/// An exported, self-contained scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenePackage {
    pub format: PackageFormat,
    pub bytes: Arc<[u8]>,
}

impl ScenePackage {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Export as a GLB container.
pub fn export_glb(model: &ModelGroup) -> MeshResult<ScenePackage> {
    let (document, buffer) = build_document(model, false)?;
    let json = serde_json::to_vec(&document).map_err(|e| MeshError::Export {
        detail: e.to_string(),
    })?;
    Ok(ScenePackage {
        format: PackageFormat::Binary,
        bytes: write_glb(&json, &buffer)?.into(),
    })
}

/// Export as glTF JSON with the binary buffer embedded as a data URI.
pub fn export_gltf_embedded(model: &ModelGroup) -> MeshResult<ScenePackage> {
    let (document, _) = build_document(model, true)?;
    let json = serde_json::to_vec(&document).map_err(|e| MeshError::Export {
        detail: e.to_string(),
    })?;
    Ok(ScenePackage {
        format: PackageFormat::Json,
        bytes: json.into(),
    })
}

/// Decode a package back into geometry for drawing.
pub fn decode_package(package: &ScenePackage) -> MeshResult<ModelGroup> {
    if package.is_empty() {
        return Err(MeshError::Empty);
    }
    import_gltf(&package.bytes, None)
}

/// Build the glTF document and its binary buffer.
///
/// With `embed` set the buffer is written into the document as a data URI.
fn build_document(model: &ModelGroup, embed: bool) -> MeshResult<(Value, Vec<u8>)> {
    let pivot = pivot_offset(model);

    let mut buffer: Vec<u8> = Vec::new();
    let mut buffer_views = Vec::new();
    let mut accessors = Vec::new();
    let mut materials = Vec::new();
    let mut meshes = Vec::new();
    let mut nodes = Vec::new();

    for part in model.parts.iter().filter(|part| !part.indices.is_empty()) {
        let positions: Vec<Vec3> = part.positions.iter().map(|p| *p + pivot).collect();
        let bounds = Aabb::from_points(positions.iter().copied());

        let position_view = push_view(
            &mut buffer,
            &mut buffer_views,
            positions.iter().flat_map(|p| p.to_array()),
            TARGET_ARRAY_BUFFER,
        );
        let index_view = push_indices(&mut buffer, &mut buffer_views, &part.indices);

        let position_accessor = accessors.len();
        accessors.push(json!({
            "bufferView": position_view,
            "componentType": COMPONENT_FLOAT,
            "count": positions.len(),
            "type": "VEC3",
            "min": bounds.min.to_array(),
            "max": bounds.max.to_array(),
        }));

        let mut attributes = json!({ "POSITION": position_accessor });
        if part.normals.len() == positions.len() {
            let normal_view = push_view(
                &mut buffer,
                &mut buffer_views,
                part.normals.iter().flat_map(|n| n.to_array()),
                TARGET_ARRAY_BUFFER,
            );
            attributes["NORMAL"] = json!(accessors.len());
            accessors.push(json!({
                "bufferView": normal_view,
                "componentType": COMPONENT_FLOAT,
                "count": part.normals.len(),
                "type": "VEC3",
            }));
        }

        let index_accessor = accessors.len();
        accessors.push(json!({
            "bufferView": index_view,
            "componentType": COMPONENT_UNSIGNED_INT,
            "count": part.indices.len(),
            "type": "SCALAR",
        }));

        let material = materials.len();
        materials.push(json!({
            "pbrMetallicRoughness": {
                "baseColorFactor": part.base_color,
                "metallicFactor": 0.0,
                "roughnessFactor": 1.0,
            },
            "doubleSided": true,
        }));

        let mut mesh = json!({
            "primitives": [{
                "attributes": attributes,
                "indices": index_accessor,
                "material": material,
            }],
        });
        if let Some(name) = &part.name {
            mesh["name"] = json!(name);
        }
        nodes.push(json!({ "mesh": meshes.len() }));
        meshes.push(mesh);
    }

    if meshes.is_empty() {
        return Err(MeshError::Empty);
    }

    let mut buffer_entry = json!({ "byteLength": buffer.len() });
    if embed {
        buffer_entry["uri"] = json!(format!(
            "data:application/octet-stream;base64,{}",
            STANDARD.encode(&buffer)
        ));
    }

    let document = json!({
        "asset": { "version": "2.0", "generator": "geoplace" },
        "scene": 0,
        "scenes": [{ "nodes": (0..nodes.len()).collect::<Vec<_>>() }],
        "nodes": nodes,
        "meshes": meshes,
        "materials": materials,
        "accessors": accessors,
        "bufferViews": buffer_views,
        "buffers": [buffer_entry],
    });
    Ok((document, buffer))
}

/// Offset that moves local geometry onto the normalization pivot, in local units.
fn pivot_offset(model: &ModelGroup) -> Vec3 {
    let transform = model.transform;
    if transform.scale.abs() > f32::EPSILON {
        transform.translation / transform.scale
    } else {
        Vec3::ZERO
    }
}

fn push_view(
    buffer: &mut Vec<u8>,
    views: &mut Vec<Value>,
    values: impl Iterator<Item = f32>,
    target: u32,
) -> usize {
    let offset = buffer.len();
    for value in values {
        buffer.extend_from_slice(&value.to_le_bytes());
    }
    views.push(json!({
        "buffer": 0,
        "byteOffset": offset,
        "byteLength": buffer.len() - offset,
        "target": target,
    }));
    views.len() - 1
}

fn push_indices(buffer: &mut Vec<u8>, views: &mut Vec<Value>, indices: &[u32]) -> usize {
    let offset = buffer.len();
    for index in indices {
        buffer.extend_from_slice(&index.to_le_bytes());
    }
    views.push(json!({
        "buffer": 0,
        "byteOffset": offset,
        "byteLength": buffer.len() - offset,
        "target": TARGET_ELEMENT_ARRAY_BUFFER,
    }));
    views.len() - 1
}

fn write_glb(json: &[u8], bin: &[u8]) -> MeshResult<Vec<u8>> {
    let mut length = 12 + 8 + json.len().next_multiple_of(4);
    if !bin.is_empty() {
        length += 8 + bin.len().next_multiple_of(4);
    }
    let glb = Glb {
        header: Header {
            magic: *b"glTF",
            version: 2,
            length: u32::try_from(length).map_err(|_| MeshError::Export {
                detail: format!("GLB too large ({length} bytes)"),
            })?,
        },
        json: Cow::Borrowed(json),
        bin: (!bin.is_empty()).then_some(Cow::Borrowed(bin)),
    };
    glb.to_vec().map_err(|e| MeshError::Export {
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{MeshPart, normalize_model};

    fn box_model() -> ModelGroup {
        let mut part = MeshPart::new(
            vec![
                Vec3::new(10.0, 2.0, 10.0),
                Vec3::new(14.0, 2.0, 10.0),
                Vec3::new(14.0, 4.0, 12.0),
            ],
            vec![0, 1, 2],
        );
        part.name = Some("roof".to_string());
        part.base_color = [0.2, 0.4, 0.6, 1.0];
        part.ensure_normals();
        ModelGroup::new(vec![part])
    }

    #[test]
    fn test_glb_header() {
        let package = export_glb(&box_model()).unwrap();
        assert_eq!(package.format, PackageFormat::Binary);
        assert_eq!(&package.bytes[0..4], b"glTF");
        let total = u32::from_le_bytes(package.bytes[8..12].try_into().unwrap());
        assert_eq!(total as usize, package.len());
        assert_eq!(package.len() % 4, 0);

        let glb = Glb::from_slice(&package.bytes).unwrap();
        let json: Value = serde_json::from_slice(&glb.json).unwrap();
        assert_eq!(json["asset"]["version"], "2.0");
        let bin = glb.bin.unwrap();
        assert_eq!(json["buffers"][0]["byteLength"].as_u64(), Some(bin.len() as u64));
    }

    #[test]
    fn test_embedded_json_has_data_uri() {
        let package = export_gltf_embedded(&box_model()).unwrap();
        assert_eq!(package.format, PackageFormat::Json);

        let value: Value = serde_json::from_slice(&package.bytes).unwrap();
        let uri = value["buffers"][0]["uri"].as_str().unwrap();
        assert!(uri.starts_with("data:application/octet-stream;base64,"));
    }

    #[test]
    fn test_export_bakes_pivot_but_not_scale() {
        let mut model = box_model();
        let scale = normalize_model(&mut model, 60.0);

        for package in [export_glb(&model).unwrap(), export_gltf_embedded(&model).unwrap()] {
            let decoded = decode_package(&package).unwrap();
            assert_eq!(decoded.parts.len(), 1);
            assert_eq!(decoded.parts[0].name.as_deref(), Some("roof"));
            assert_eq!(decoded.parts[0].base_color, [0.2, 0.4, 0.6, 1.0]);

            let bounds = decoded.local_bounds();
            assert!(bounds.min.y.abs() < 1e-4);
            assert!(bounds.center().x.abs() < 1e-4);
            assert!(bounds.center().z.abs() < 1e-4);
            assert!((bounds.max_extent() * scale - 60.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_export_empty_model_fails() {
        assert_eq!(export_glb(&ModelGroup::default()).unwrap_err(), MeshError::Empty);
        let empty = ScenePackage {
            format: PackageFormat::Binary,
            bytes: Arc::from(Vec::new()),
        };
        assert_eq!(decode_package(&empty).unwrap_err(), MeshError::Empty);
    }
}

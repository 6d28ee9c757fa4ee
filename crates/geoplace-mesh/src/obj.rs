//! Wavefront OBJ import.
//!
//! A streaming line parser for the subset that matters for placement:
//! `v`, `vn`, `f`, `o` and `g`. Polygons are fan-triangulated, negative
//! (relative) indices are resolved, and every `o`/`g` statement starts a new
//! [`MeshPart`]. Materials and texture coordinates are ignored.

use std::collections::HashMap;

use glam::Vec3;

use crate::error::{MeshError, MeshResult};
use crate::group::{MeshPart, ModelGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey {
    position: usize,
    normal: Option<usize>,
}

/// Part under construction, with its own vertex deduplication table.
#[derive(Default)]
struct PartBuilder {
    name: Option<String>,
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    indices: Vec<u32>,
    lookup: HashMap<VertexKey, u32>,
    has_normals: bool,
}

impl PartBuilder {
    fn named(name: Option<String>) -> Self {
        Self {
            name,
            has_normals: true,
            ..Default::default()
        }
    }

    fn vertex(&mut self, key: VertexKey, positions: &[Vec3], normals: &[Vec3]) -> u32 {
        if let Some(&index) = self.lookup.get(&key) {
            return index;
        }

        #[allow(clippy::cast_possible_truncation)]
        let index = self.positions.len() as u32;
        self.positions.push(positions[key.position]);
        match key.normal {
            Some(n) => self.normals.push(normals[n]),
            None => {
                self.has_normals = false;
                self.normals.push(Vec3::ZERO);
            }
        }
        self.lookup.insert(key, index);
        index
    }

    fn finish(self) -> Option<MeshPart> {
        if self.indices.is_empty() {
            return None;
        }
        let mut part = MeshPart::new(self.positions, self.indices);
        part.name = self.name;
        if self.has_normals {
            part.normals = self.normals;
        }
        part.ensure_normals();
        Some(part)
    }
}

/// Parse OBJ text into a [`ModelGroup`].
pub fn import_obj(bytes: &[u8]) -> MeshResult<ModelGroup> {
    let text = String::from_utf8_lossy(bytes);

    let mut positions: Vec<Vec3> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut parts: Vec<MeshPart> = Vec::new();
    let mut current = PartBuilder::named(None);

    for (line_index, raw) in text.lines().enumerate() {
        let line_no = line_index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let Some(tag) = tokens.next() else {
            continue;
        };

        match tag {
            "v" => positions.push(parse_vec3(&mut tokens, line_no)?),
            "vn" => normals.push(parse_vec3(&mut tokens, line_no)?),
            "o" | "g" => {
                let name = tokens.collect::<Vec<_>>().join(" ");
                let name = (!name.is_empty()).then_some(name);
                let finished = std::mem::replace(&mut current, PartBuilder::named(name));
                parts.extend(finished.finish());
            }
            "f" => {
                let corners = tokens
                    .map(|token| parse_corner(token, positions.len(), normals.len(), line_no))
                    .collect::<MeshResult<Vec<_>>>()?;
                if corners.len() < 3 {
                    return Err(MeshError::Obj {
                        line: line_no,
                        detail: format!("face has {} vertices", corners.len()),
                    });
                }

                let corners: Vec<u32> = corners
                    .into_iter()
                    .map(|key| current.vertex(key, &positions, &normals))
                    .collect();
                for i in 1..corners.len() - 1 {
                    current
                        .indices
                        .extend_from_slice(&[corners[0], corners[i], corners[i + 1]]);
                }
            }
            // Texture coordinates, materials, smoothing groups, lines and points.
            _ => {}
        }
    }
    parts.extend(current.finish());

    if parts.is_empty() {
        return Err(MeshError::Empty);
    }

    tracing::debug!(
        parts = parts.len(),
        vertices = positions.len(),
        "Imported OBJ model"
    );
    Ok(ModelGroup::new(parts))
}

fn parse_vec3<'a>(tokens: &mut impl Iterator<Item = &'a str>, line: usize) -> MeshResult<Vec3> {
    let mut values = [0.0f32; 3];
    for value in &mut values {
        let token = tokens.next().ok_or_else(|| MeshError::Obj {
            line,
            detail: "expected three components".to_string(),
        })?;
        *value = token.parse().map_err(|_| MeshError::Obj {
            line,
            detail: format!("invalid number {token:?}"),
        })?;
    }
    Ok(Vec3::from_array(values))
}

/// Parse a `v`, `v/vt`, `v//vn` or `v/vt/vn` face corner.
fn parse_corner(
    token: &str,
    position_count: usize,
    normal_count: usize,
    line: usize,
) -> MeshResult<VertexKey> {
    let mut fields = token.split('/');
    let position = fields
        .next()
        .filter(|field| !field.is_empty())
        .ok_or_else(|| MeshError::Obj {
            line,
            detail: format!("invalid face vertex {token:?}"),
        })?;
    let position = resolve_index(position, position_count, line)?;

    let _texcoord = fields.next();
    let normal = match fields.next().filter(|field| !field.is_empty()) {
        Some(field) => Some(resolve_index(field, normal_count, line)?),
        None => None,
    };

    Ok(VertexKey { position, normal })
}

/// Resolve a one-based (or negative, relative) OBJ index to a zero-based one.
fn resolve_index(field: &str, len: usize, line: usize) -> MeshResult<usize> {
    let raw: i64 = field.parse().map_err(|_| MeshError::Obj {
        line,
        detail: format!("invalid index {field:?}"),
    })?;
    let len_i64 = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if raw > 0 { raw - 1 } else { len_i64 + raw };

    if raw == 0 || resolved < 0 || resolved >= len_i64 {
        return Err(MeshError::Obj {
            line,
            detail: format!("index {raw} out of range (have {len})"),
        });
    }
    usize::try_from(resolved).map_err(|_| MeshError::Obj {
        line,
        detail: format!("index {raw} out of range (have {len})"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
# a unit quad
v 0 0 0
v 1 0 0
v 1 0 1
v 0 0 1
vn 0 1 0
f 1//1 2//1 3//1 4//1
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let group = import_obj(QUAD.as_bytes()).unwrap();
        assert_eq!(group.parts.len(), 1);

        let part = &group.parts[0];
        assert_eq!(part.positions.len(), 4);
        assert_eq!(part.indices, vec![0, 1, 2, 0, 2, 3]);
        assert!(part.normals.iter().all(|n| *n == Vec3::Y));
    }

    #[test]
    fn test_negative_indices() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let group = import_obj(obj.as_bytes()).unwrap();
        let part = &group.parts[0];
        assert_eq!(part.positions, vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
        assert_eq!(part.indices, vec![0, 1, 2]);
        // Generated from winding.
        assert!((part.normals[0].z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_objects_become_parts() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
o first
f 1 2 3
g second part
f 3/1 2/2 1/3
";
        let group = import_obj(obj.as_bytes()).unwrap();
        assert_eq!(group.parts.len(), 2);
        assert_eq!(group.parts[0].name.as_deref(), Some("first"));
        assert_eq!(group.parts[1].name.as_deref(), Some("second part"));
        assert_eq!(group.triangle_count(), 2);
    }

    #[test]
    fn test_out_of_range_index_reports_line() {
        let obj = "v 0 0 0\nv 1 0 0\n\nf 1 2 9\n";
        let err = import_obj(obj.as_bytes()).unwrap_err();
        assert!(matches!(err, MeshError::Obj { line: 4, .. }), "{err}");
    }

    #[test]
    fn test_bad_vertex_reports_line() {
        let err = import_obj(b"v 0 zero 0\n").unwrap_err();
        assert!(matches!(err, MeshError::Obj { line: 1, .. }));
    }

    #[test]
    fn test_no_faces_is_empty() {
        let err = import_obj(b"v 0 0 0\nv 1 1 1\n").unwrap_err();
        assert_eq!(err, MeshError::Empty);
    }
}

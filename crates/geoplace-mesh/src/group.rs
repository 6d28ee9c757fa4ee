//! In-memory model representation and bounding-box normalization.

use glam::Vec3;

use crate::bounds::Aabb;

/// Default largest extent of a normalized model, in model units.
pub const DEFAULT_TARGET_SIZE: f32 = 60.0;

/// One drawable piece of a model: an indexed triangle list with a flat colour.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPart {
    pub name: Option<String>,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub indices: Vec<u32>,
    /// Linear RGBA base colour factor.
    pub base_color: [f32; 4],
}

impl MeshPart {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            name: None,
            positions,
            normals: Vec::new(),
            indices,
            base_color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Fill in flat-accumulated vertex normals when the source had none.
    pub fn ensure_normals(&mut self) {
        if self.normals.len() == self.positions.len() {
            return;
        }

        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (Some(pa), Some(pb), Some(pc)) = (
                self.positions.get(a),
                self.positions.get(b),
                self.positions.get(c),
            ) else {
                continue;
            };
            let face = (*pb - *pa).cross(*pc - *pa);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }

        self.normals = normals
            .into_iter()
            .map(|n| n.try_normalize().unwrap_or(Vec3::Y))
            .collect();
    }
}

/// Transform applied on top of a group's local geometry: `p * scale + translation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupTransform {
    pub scale: f32,
    pub translation: Vec3,
}

impl Default for GroupTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translation: Vec3::ZERO,
        }
    }
}

impl GroupTransform {
    pub fn apply(&self, point: Vec3) -> Vec3 {
        point * self.scale + self.translation
    }
}

/// An imported model: a set of parts sharing one group transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelGroup {
    pub parts: Vec<MeshPart>,
    pub transform: GroupTransform,
}

impl ModelGroup {
    pub fn new(parts: Vec<MeshPart>) -> Self {
        Self {
            parts,
            transform: GroupTransform::default(),
        }
    }

    /// Bounds of the untransformed geometry.
    pub fn local_bounds(&self) -> Aabb {
        Aabb::from_points(self.parts.iter().flat_map(|p| p.positions.iter().copied()))
    }

    /// Bounds after applying the group transform.
    pub fn bounds(&self) -> Aabb {
        self.local_bounds()
            .scaled_translated(self.transform.scale, self.transform.translation)
    }

    pub fn vertex_count(&self) -> usize {
        self.parts.iter().map(|p| p.positions.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(MeshPart::triangle_count).sum()
    }
}

/// Scale `model` so its largest extent equals `target_size`, then move it so the
/// horizontal (X/Z) centre sits at the origin and its lowest point at `y = 0`.
///
/// The group transform is overwritten; geometry is untouched. A degenerate or
/// empty model is treated as having an extent of 1. Returns the applied scale.
pub fn normalize_model(model: &mut ModelGroup, target_size: f32) -> f32 {
    let local = model.local_bounds();
    let extent = local.max_extent();
    let extent = if extent.is_finite() && extent > 0.0 {
        extent
    } else {
        1.0
    };
    let scale = target_size / extent;

    let scaled = local.scaled_translated(scale, Vec3::ZERO);
    let center = scaled.center();
    let min_y = if scaled.is_empty() { 0.0 } else { scaled.min.y };

    model.transform = GroupTransform {
        scale,
        translation: Vec3::new(-center.x, -min_y, -center.z),
    };
    scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cube(min: Vec3, max: Vec3) -> ModelGroup {
        let positions = vec![
            min,
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, max.y, max.z),
            max,
        ];
        ModelGroup::new(vec![MeshPart::new(positions, vec![0, 1, 2, 2, 3, 4])])
    }

    #[test]
    fn test_normalize_scales_largest_extent() {
        let mut model = cube(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 10.0, 4.0));
        let scale = normalize_model(&mut model, 60.0);

        assert!((scale - 6.0).abs() < 1e-5);
        let bounds = model.bounds();
        assert!((bounds.max_extent() - 60.0).abs() < 1e-3);
    }

    #[test]
    fn test_normalize_centers_footprint_and_grounds_model() {
        let mut model = cube(Vec3::new(10.0, -3.0, 5.0), Vec3::new(14.0, 1.0, 7.0));
        normalize_model(&mut model, 60.0);

        let bounds = model.bounds();
        let center = bounds.center();
        assert!(center.x.abs() < 1e-3);
        assert!(center.z.abs() < 1e-3);
        assert!(bounds.min.y.abs() < 1e-3);
    }

    #[test]
    fn test_normalize_degenerate_model_uses_unit_extent() {
        let mut model = ModelGroup::new(vec![MeshPart::new(vec![Vec3::splat(3.0)], vec![])]);
        let scale = normalize_model(&mut model, 60.0);
        assert!((scale - 60.0).abs() < f32::EPSILON);

        let mut empty = ModelGroup::default();
        let scale = normalize_model(&mut empty, 25.0);
        assert!((scale - 25.0).abs() < f32::EPSILON);
        assert_eq!(empty.transform.translation, Vec3::ZERO);
    }

    #[test]
    fn test_normalize_overwrites_previous_transform() {
        let mut model = cube(Vec3::ZERO, Vec3::splat(2.0));
        model.transform = GroupTransform {
            scale: 100.0,
            translation: Vec3::splat(50.0),
        };
        normalize_model(&mut model, 60.0);
        assert!((model.transform.scale - 30.0).abs() < 1e-5);
        assert!(model.bounds().min.y.abs() < 1e-3);
    }

    #[test]
    fn test_ensure_normals_generates_unit_vectors() {
        let mut part = MeshPart::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Z],
            vec![0, 2, 1],
        );
        part.ensure_normals();
        assert_eq!(part.normals.len(), 3);
        for n in &part.normals {
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!((n.y - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_ensure_normals_keeps_existing() {
        let mut part = MeshPart::new(vec![Vec3::ZERO], vec![]);
        part.normals = vec![Vec3::X];
        part.ensure_normals();
        assert_eq!(part.normals, vec![Vec3::X]);
    }

    proptest! {
        #[test]
        fn test_normalize_invariants(
            min in prop::array::uniform3(-100.0f32..100.0),
            size in prop::array::uniform3(1.0f32..500.0),
            target in 1.0f32..200.0,
        ) {
            let min = Vec3::from_array(min);
            let max = min + Vec3::from_array(size);
            let mut model = cube(min, max);
            normalize_model(&mut model, target);

            let bounds = model.bounds();
            let tolerance = target * 1e-3;
            prop_assert!((bounds.max_extent() - target).abs() < tolerance);
            prop_assert!(bounds.min.y.abs() < tolerance);
            prop_assert!(bounds.center().x.abs() < tolerance);
            prop_assert!(bounds.center().z.abs() < tolerance);
        }
    }
}

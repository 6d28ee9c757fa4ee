//! Axis-aligned bounding boxes.

use glam::Vec3;

/// An axis-aligned bounding box.
///
/// An empty box has `min > max` on every axis; its size and center are zero,
/// which makes degenerate models fall back to a unit extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// A box containing nothing.
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Build the smallest box containing every point.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut aabb = Self::EMPTY;
        for point in points {
            aabb.extend(point);
        }
        aabb
    }

    /// Grow the box to contain `point`.
    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow the box to contain `other`.
    pub fn union(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        self.extend(other.min);
        self.extend(other.max);
    }

    pub fn is_empty(&self) -> bool {
        self.max.x < self.min.x || self.max.y < self.min.y || self.max.z < self.min.z
    }

    /// Extent along each axis (zero for an empty box).
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Center point (origin for an empty box).
    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    /// Largest extent across the three axes.
    pub fn max_extent(&self) -> f32 {
        self.size().max_element()
    }

    /// Apply a uniform scale followed by a translation.
    #[must_use]
    pub fn scaled_translated(&self, scale: f32, translation: Vec3) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::from_points([
            self.min * scale + translation,
            self.max * scale + translation,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_box_has_zero_size() {
        let aabb = Aabb::EMPTY;
        assert!(aabb.is_empty());
        assert_eq!(aabb.size(), Vec3::ZERO);
        assert_eq!(aabb.center(), Vec3::ZERO);
        assert!(aabb.max_extent().abs() < f32::EPSILON);
    }

    #[test]
    fn test_from_points() {
        let aabb = Aabb::from_points([
            Vec3::new(-1.0, 2.0, 3.0),
            Vec3::new(4.0, -5.0, 0.5),
            Vec3::new(0.0, 0.0, 0.0),
        ]);
        assert_eq!(aabb.min, Vec3::new(-1.0, -5.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(4.0, 2.0, 3.0));
        assert_eq!(aabb.size(), Vec3::new(5.0, 7.0, 3.0));
        assert!((aabb.max_extent() - 7.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_single_point_is_degenerate_not_empty() {
        let aabb = Aabb::from_points([Vec3::ONE]);
        assert!(!aabb.is_empty());
        assert_eq!(aabb.size(), Vec3::ZERO);
        assert_eq!(aabb.center(), Vec3::ONE);
    }

    #[test]
    fn test_union_ignores_empty() {
        let mut aabb = Aabb::from_points([Vec3::ZERO, Vec3::ONE]);
        aabb.union(&Aabb::EMPTY);
        assert_eq!(aabb.max, Vec3::ONE);

        aabb.union(&Aabb::from_points([Vec3::splat(-2.0)]));
        assert_eq!(aabb.min, Vec3::splat(-2.0));
    }

    #[test]
    fn test_scaled_translated() {
        let aabb = Aabb::from_points([Vec3::ZERO, Vec3::new(2.0, 4.0, 6.0)]);
        let moved = aabb.scaled_translated(0.5, Vec3::new(1.0, 0.0, -1.0));
        assert_eq!(moved.min, Vec3::new(1.0, 0.0, -1.0));
        assert_eq!(moved.max, Vec3::new(2.0, 2.0, 2.0));
    }
}

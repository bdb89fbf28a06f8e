//! Math utilities
//!
//! Re-exports from glam plus the bounding volume used by evaluated meshes.

pub use glam::{Mat4, Vec3};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that any point expands into
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create an AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box enclosing every point, `EMPTY` for no points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut aabb = Self::EMPTY;
        for point in points {
            aabb.expand_to_include(*point);
        }
        aabb
    }

    /// Get the full size of the AABB
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Check if the AABB is empty
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand the AABB to include a point
    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Matrix translating by `offset`
pub fn translation(offset: Vec3) -> Mat4 {
    Mat4::from_translation(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_creation() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(aabb.size(), Vec3::ONE);
    }

    #[test]
    fn test_aabb_from_points() {
        let points = [Vec3::new(-1.0, 2.0, 0.0), Vec3::new(3.0, -4.0, 1.0)];
        let aabb = Aabb::from_points(&points);
        assert_eq!(aabb.min, Vec3::new(-1.0, -4.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(3.0, 2.0, 1.0));
        assert!(Aabb::from_points(&[]).is_empty());
    }

    #[test]
    fn test_translation() {
        let moved = translation(Vec3::new(1.0, 2.0, 3.0)).transform_point3(Vec3::ONE);
        assert_eq!(moved, Vec3::new(2.0, 3.0, 4.0));
    }
}

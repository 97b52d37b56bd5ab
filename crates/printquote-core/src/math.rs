//! Math utilities
//!
//! Re-exports from glam and the double-precision helpers used by geometry
//! analysis. Everything here works in millimetres.

pub use glam::{DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: DVec3,
    /// Maximum corner
    pub max: DVec3,
}

impl Aabb {
    /// Create an empty AABB
    pub const EMPTY: Self = Self {
        min: DVec3::splat(f64::INFINITY),
        max: DVec3::splat(f64::NEG_INFINITY),
    };

    /// Smallest AABB enclosing every point
    pub fn from_points<I: IntoIterator<Item = DVec3>>(points: I) -> Self {
        let mut result = Self::EMPTY;
        for point in points {
            result.expand_to_include(point);
        }
        result
    }

    /// Get the full size of the AABB. An empty box has zero size.
    pub fn size(&self) -> DVec3 {
        if self.is_empty() {
            DVec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Check if the AABB is empty
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Expand the AABB to include a point
    pub fn expand_to_include(&mut self, point: DVec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }
}

/// Rotation applied to a mesh instance before measuring it.
///
/// Orientation never changes the enclosed volume, only the bounding box and
/// which facets face downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    rotation: DQuat,
}

impl Orientation {
    /// The mesh as loaded
    pub const IDENTITY: Self = Self {
        rotation: DQuat::IDENTITY,
    };

    /// Create an orientation from a quaternion
    pub fn from_quat(rotation: DQuat) -> Self {
        Self {
            rotation: rotation.normalize(),
        }
    }

    /// Create an orientation from XYZ Euler angles in degrees
    pub fn from_euler_degrees(x: f64, y: f64, z: f64) -> Self {
        Self::from_quat(DQuat::from_euler(
            EulerRot::XYZ,
            x.to_radians(),
            y.to_radians(),
            z.to_radians(),
        ))
    }

    /// Underlying rotation
    pub fn rotation(&self) -> DQuat {
        self.rotation
    }

    /// Rotate a point about the origin
    pub fn apply(&self, point: DVec3) -> DVec3 {
        self.rotation * point
    }

    pub fn is_identity(&self) -> bool {
        self.rotation == DQuat::IDENTITY
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Float error below this fraction of a unit does not push a value up to the
/// next multiple
const MULTIPLE_TOLERANCE: f64 = 1e-9;

/// Round `value` up to the next multiple of `unit`
pub fn ceil_to_multiple(value: f64, unit: f64) -> f64 {
    (value / unit - MULTIPLE_TOLERANCE).ceil() * unit
}

/// Round `value` to `decimals` fractional digits
pub fn round_to_decimals(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points([
            DVec3::new(1.0, -2.0, 0.0),
            DVec3::new(-1.0, 2.0, 5.0),
        ]);
        assert_eq!(aabb.min, DVec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.size(), DVec3::new(2.0, 4.0, 5.0));
    }

    #[test]
    fn test_empty_aabb_has_zero_size() {
        let aabb = Aabb::from_points(std::iter::empty());
        assert!(aabb.is_empty());
        assert_eq!(aabb.size(), DVec3::ZERO);
    }

    #[test]
    fn test_orientation_rotates_about_origin() {
        let orientation = Orientation::from_euler_degrees(90.0, 0.0, 0.0);
        let rotated = orientation.apply(DVec3::Y);
        assert!((rotated - DVec3::Z).length() < 1e-12);
        assert!(Orientation::default().is_identity());
    }

    #[test]
    fn test_rounding_helpers() {
        assert_eq!(ceil_to_multiple(12_001.0, 1000.0), 13_000.0);
        assert_eq!(ceil_to_multiple(12_000.0, 1000.0), 12_000.0);
        assert_eq!(ceil_to_multiple(747_000.000_000_000_1, 1000.0), 747_000.0);
        assert_eq!(ceil_to_multiple(0.0, 1000.0), 0.0);
        assert_eq!(round_to_decimals(1.23456, 2), 1.23);
    }
}

//! 3D positions for emitters and the listener

use serde::{Deserialize, Serialize};

/// 3D position in world space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position3D {
    /// X coordinate (left/right, positive = right)
    pub x: f32,
    /// Y coordinate (front/back, positive = front)
    pub y: f32,
    /// Z coordinate (up/down, positive = up)
    pub z: f32,
}

impl Position3D {
    /// Create new position
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Origin position
    pub fn origin() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Get magnitude (distance from origin)
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Euclidean distance to another position
    pub fn distance_to(&self, other: &Position3D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Horizontal angle of `other` as seen from this position, in degrees
    ///
    /// 0 = straight ahead (+y), positive = to the right.
    pub fn azimuth_to(&self, other: &Position3D) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        if dx.abs() < 1e-10 && dy.abs() < 1e-10 {
            return 0.0;
        }
        dx.atan2(dy).to_degrees()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance() {
        let a = Position3D::new(1.0, 2.0, 2.0);
        assert_relative_eq!(a.magnitude(), 3.0);
        assert_relative_eq!(a.distance_to(&Position3D::origin()), 3.0);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_azimuth() {
        let listener = Position3D::origin();
        assert_relative_eq!(listener.azimuth_to(&Position3D::new(0.0, 1.0, 0.0)), 0.0);
        assert_relative_eq!(listener.azimuth_to(&Position3D::new(1.0, 0.0, 0.0)), 90.0);
        assert_eq!(listener.azimuth_to(&listener), 0.0);
    }
}

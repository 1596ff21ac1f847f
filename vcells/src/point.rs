//! A point in the open unit cube, plus the distance math the rest of the
//! crate needs.

use crate::error::ConfigError;

/// A point in R^3, expected (but not statically guaranteed) to lie strictly
/// inside the unit cube `(0,1)^3`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Point3 { x, y, z }
    }

    pub fn distance_sq(&self, other: &Point3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Returns an error if any coordinate is outside the open interval (0,1).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_range = |v: f32| v.is_finite() && v > 0.0 && v < 1.0;
        if !in_range(self.x) || !in_range(self.y) || !in_range(self.z) {
            return Err(ConfigError::PointOutOfBounds {
                x: self.x,
                y: self.y,
                z: self.z,
            });
        }
        Ok(())
    }
}

/// Validates every point in `points`, short-circuiting on the first offender.
pub fn validate_all(points: &[Point3]) -> Result<(), ConfigError> {
    for p in points {
        p.validate()?;
    }
    Ok(())
}

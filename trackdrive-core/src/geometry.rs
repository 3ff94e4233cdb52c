//! 2D geometry primitives
//!
//! Coordinate system: track frame, millimeters
//! - X: Right (positive = right)
//! - Y: Down (positive = down), origin at the top-left corner of the
//!   assembled track's bounding box
//!
//! Headings are degrees, 0° = "up" (negative Y), increasing clockwise.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// Distances below this are treated as "no movement" when deriving a heading
pub const HEADING_EPSILON: f64 = 0.01;

/// A position or displacement in the track frame
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(&self, other: &Vector) -> f64 {
        (*other - *self).length()
    }

    /// Rotate clockwise (in the y-down frame) about the origin
    pub fn rotate(&self, angle: Angle) -> Vector {
        let (sin, cos) = angle.to_radians().sin_cos();
        Vector::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }

    /// Component-wise minimum
    pub fn min(&self, other: &Vector) -> Vector {
        Vector::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum
    pub fn max(&self, other: &Vector) -> Vector {
        Vector::new(self.x.max(other.x), self.y.max(other.y))
    }

    pub fn approx_eq(&self, other: &Vector, tolerance: f64) -> bool {
        self.distance(other) <= tolerance
    }
}

impl Add for Vector {
    type Output = Vector;

    fn add(self, rhs: Vector) -> Vector {
        Vector::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector {
    type Output = Vector;

    fn sub(self, rhs: Vector) -> Vector {
        Vector::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    fn mul(self, rhs: f64) -> Vector {
        Vector::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vector {
    type Output = Vector;

    fn neg(self) -> Vector {
        Vector::new(-self.x, -self.y)
    }
}

/// A heading in degrees, normalized to [0, 360)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Angle(f64);

impl Angle {
    pub const UP: Angle = Angle(0.0);

    pub fn from_degrees(degrees: f64) -> Self {
        Self(degrees.rem_euclid(360.0))
    }

    pub fn degrees(&self) -> f64 {
        self.0
    }

    pub fn to_radians(&self) -> f64 {
        self.0.to_radians()
    }

    /// Unit vector pointing along this heading
    pub fn unit_vector(&self) -> Vector {
        let (sin, cos) = self.to_radians().sin_cos();
        Vector::new(sin, -cos)
    }

    /// Heading of the displacement from `from` to `to`
    ///
    /// Returns `None` when the points are closer than [`HEADING_EPSILON`],
    /// where the direction is numerically meaningless.
    pub fn between(from: &Vector, to: &Vector) -> Option<Angle> {
        let delta = *to - *from;
        if delta.length() < HEADING_EPSILON {
            return None;
        }
        Some(Angle::from_degrees(delta.x.atan2(-delta.y).to_degrees()))
    }

    pub fn rotate(&self, degrees: f64) -> Angle {
        Angle::from_degrees(self.0 + degrees)
    }

    /// Smallest signed difference `other - self`, in (-180, 180]
    pub fn delta_to(&self, other: &Angle) -> f64 {
        let d = (other.0 - self.0).rem_euclid(360.0);
        if d > 180.0 {
            d - 360.0
        } else {
            d
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_rotate_quarter_turn_clockwise() {
        // Up rotated 90° clockwise points right
        let v = Vector::new(0.0, -1.0).rotate(Angle::from_degrees(90.0));
        assert!(v.approx_eq(&Vector::new(1.0, 0.0), 1e-9), "got {:?}", v);
    }

    #[test]
    fn test_unit_vector_matches_between() {
        for deg in [0.0, 45.0, 90.0, 180.0, 270.0, 315.0] {
            let a = Angle::from_degrees(deg);
            let b = Angle::between(&Vector::ZERO, &(a.unit_vector() * 10.0)).unwrap();
            assert!(close(a.delta_to(&b), 0.0), "{} vs {}", deg, b.degrees());
        }
    }

    #[test]
    fn test_between_degenerate_is_none() {
        let p = Vector::new(3.0, 4.0);
        assert!(Angle::between(&p, &(p + Vector::new(0.001, 0.0))).is_none());
    }

    #[test]
    fn test_angle_normalization() {
        assert!(close(Angle::from_degrees(-90.0).degrees(), 270.0));
        assert!(close(Angle::from_degrees(720.0).degrees(), 0.0));
        assert!(close(Angle::from_degrees(350.0).delta_to(&Angle::from_degrees(10.0)), 20.0));
    }

    #[test]
    fn test_distance() {
        assert!(close(Vector::new(0.0, 0.0).distance(&Vector::new(3.0, 4.0)), 5.0));
    }
}

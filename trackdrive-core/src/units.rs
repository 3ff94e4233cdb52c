//! Type-safe wrappers for track units
//!
//! Newtype wrappers around f64 used in the outbound position model so that
//! millimeters, speeds and headings cannot be confused with each other.
//!
//! All unit types serialize with 3 decimal places to keep update payloads small.

use serde::{Deserialize, Serialize};

/// Round f64 to 3 decimal places for compact JSON serialization
fn round3<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*val * 1000.0).round() / 1000.0)
}

/// Millimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Millimeters(#[serde(serialize_with = "round3")] pub f64);

/// Millimeters per second
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct MillimetersPerSecond(#[serde(serialize_with = "round3")] pub f64);

impl MillimetersPerSecond {
    /// Distance covered in one tick at the given tick rate
    pub fn per_tick(&self, ticks_per_second: f64) -> Millimeters {
        Millimeters(self.0 / ticks_per_second)
    }
}

/// Millimeters per second squared (acceleration)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct MillimetersPerSecondSquared(#[serde(serialize_with = "round3")] pub f64);

/// Degrees
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Degrees(#[serde(serialize_with = "round3")] pub f64);

impl Degrees {
    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }
}

/// Speed as a share of a vehicle's rated maximum (0.0 to 100.0)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct SpeedPercent(#[serde(serialize_with = "round3")] pub f64);

impl SpeedPercent {
    /// Create a new percentage, clamping to [0.0, 100.0]
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 100.0))
    }

    /// Convert to an absolute speed given the rated maximum
    pub fn of(&self, max: MillimetersPerSecond) -> MillimetersPerSecond {
        MillimetersPerSecond(max.0 * self.0 / 100.0)
    }
}

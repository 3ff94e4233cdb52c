//! Position update model
//!
//! Defines the per-tick update every simulator publishes to its consumers
//! (UI broadcast, collision detection, logging).
//!
//! Coordinate system: track frame, see [`crate::geometry`].

use crate::geometry::{Angle, Vector};
use crate::units::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Motion telemetry attached to every position update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionTelemetry {
    /// Lateral offset from the centerline, positive = right of the driving direction
    pub offset: Millimeters,

    /// Actual speed
    pub speed: MillimetersPerSecond,

    /// Whether the vehicle currently travels clockwise around the loop
    pub going_clockwise: bool,

    /// Whether a U-turn maneuver is in progress
    pub uturn_in_progress: bool,
}

/// One tick's worth of simulated position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionUpdate {
    /// Wall-clock time the tick completed
    pub timestamp: DateTime<Utc>,

    /// Tick counter since the simulator was created
    pub tick: u64,

    /// Position in the track frame
    pub position: Vector,

    /// Heading, 0° = up
    pub angle: Angle,

    /// Index of the piece the vehicle is on
    pub piece_index: usize,

    /// Distance travelled along the current piece
    pub progress: Millimeters,

    pub telemetry: MotionTelemetry,
}

impl PositionUpdate {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

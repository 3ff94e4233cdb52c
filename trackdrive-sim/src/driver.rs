//! Hardware driver interface
//!
//! The transport layer that speaks the car's wire protocol lives outside
//! this crate. It hands us decoded events and accepts simple drive commands.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use trackdrive_core::PhysicalId;

/// Decoded telemetry from a physical car
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DriverEvent {
    /// The car read a location code on a piece
    Location {
        location: u8,
        piece_id: PhysicalId,
        /// Offset from road center, positive = right of the car's direction
        offset_mm: f64,
        speed_mm_s: f64,
        /// Set when the car reads the piece against its nominal direction
        reversed: bool,
    },
    /// The car crossed from one piece onto the next
    Transition {
        piece_id: PhysicalId,
        prev_piece_id: PhysicalId,
        offset_mm: f64,
        reversed: bool,
    },
}

/// Trait for vehicle transports
///
/// Each driver is responsible for:
/// - Forwarding drive commands to the car
/// - Buffering decoded telemetry until it is polled
pub trait VehicleDriver: Send {
    /// Get the name of this driver (e.g., "Demo", "BLE")
    fn name(&self) -> &str;

    /// Ask the car to drive at `speed_mm_s`, reaching it at `acceleration_mm_s2`
    fn change_speed(&mut self, speed_mm_s: f64, acceleration_mm_s2: f64) -> Result<()>;

    /// Ask the car to move to `offset_mm` from road center (driving frame)
    fn change_lane(&mut self, offset_mm: f64) -> Result<()>;

    /// Ask the car to turn around
    fn do_turn(&mut self) -> Result<()>;

    /// Drain telemetry received since the last poll
    ///
    /// Returns an empty list if nothing arrived (non-blocking).
    fn poll_events(&mut self) -> Result<Vec<DriverEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = DriverEvent::Transition {
            piece_id: 17,
            prev_piece_id: 36,
            offset_mm: -23.0,
            reversed: false,
        };
        let json = serde_json::to_value(event).unwrap();
        assert_eq!(json["event"], "transition");
        assert_eq!(json["prev_piece_id"], 36);

        let back: DriverEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}

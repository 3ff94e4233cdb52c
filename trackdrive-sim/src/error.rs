//! Error types for the simulator

use trackdrive_core::TrackError;

/// Result type alias
pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Leftover distance points against the travel direction; rolling over
    /// would never terminate
    #[error("Leftover distance {leftover} contradicts direction {direction}")]
    ImpossibleDirection { leftover: f64, direction: i8 },

    /// Travel distance is NaN or infinite
    #[error("Non-finite travel distance: {0}")]
    NonFiniteDistance(f64),

    /// Roll-over crossed more pieces than one tick can cover
    #[error("Roll-over did not settle after {0} piece crossings")]
    RollOverLimit(usize),

    /// Tick rate gives no usable loop period
    #[error("Invalid tick rate: {0} ticks per second")]
    InvalidTickRate(f64),

    /// The background tick loop could not be started
    #[error("Failed to spawn tick loop: {0}")]
    Spawn(#[from] std::io::Error),

    #[error(transparent)]
    Track(#[from] TrackError),
}

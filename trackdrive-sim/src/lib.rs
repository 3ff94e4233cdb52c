//! TrackDrive Simulator
//!
//! This crate keeps simulated vehicles moving along a track at a fixed tick
//! rate, and reconciles simulated vehicles with the sparse telemetry of the
//! physical cars they shadow.

pub mod config;
pub mod demo;
pub mod driver;
pub mod error;
pub mod fusion;
pub mod physical;
pub mod simulator;
mod uturn;
pub mod vehicle;

pub use config::{FusionConfig, SimulatorConfig, UTurnConfig};
pub use demo::DemoDriver;
pub use driver::{DriverEvent, VehicleDriver};
pub use error::{Result, SimError};
pub use fusion::{FusionSnapshot, LocationOutcome, PieceHistory, Resolution};
pub use physical::PhysicalLocationService;
pub use simulator::{LocationService, MotionSnapshot, UpdateCallback};
pub use vehicle::{Locator, Vehicle};

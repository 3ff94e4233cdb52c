//! TrackDrive Core Library
//!
//! This crate provides the track geometry model (pieces, placement, lap
//! arithmetic), the persisted track format, and the position update model
//! shared by simulators and their consumers.

pub mod error;
pub mod geometry;
pub mod model;
pub mod piece;
pub mod record;
pub mod track;
pub mod units;

pub use error::{Result, TrackError};
pub use geometry::{Angle, Vector};
pub use model::{MotionTelemetry, PositionUpdate};
pub use piece::{PhysicalId, PieceKind, Rotation, TrackPiece};
pub use record::PieceRecord;
pub use track::{FullTrack, TrackBuilder};

//! TrackDrive Runner Library
//!
//! Exposes the run configuration, fleet assembly and manager loop for
//! integration testing.

pub mod config;
pub mod fleet;
pub mod manager;

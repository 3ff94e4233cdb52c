//! Run configuration
//!
//! Read from the JSON file named by the first CLI argument, or by the
//! `TRACKDRIVE_CONFIG` environment variable. With neither, the built-in demo
//! configuration is used.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use trackdrive_core::PieceRecord;
use trackdrive_sim::SimulatorConfig;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "TRACKDRIVE_CONFIG";

const DEMO_CONFIG: &str = include_str!("../config/demo.json");

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Pieces in driving order
    pub track: Vec<PieceRecord>,

    #[serde(default)]
    pub simulator: SimulatorConfig,

    #[serde(default)]
    pub vehicles: Vec<VehicleConfig>,

    /// Stop after this long; runs until Ctrl-C when absent
    #[serde(default)]
    pub run_for_secs: Option<f64>,

    /// Period of the per-vehicle status log line
    #[serde(default = "default_summary_interval")]
    pub summary_interval_secs: f64,
}

fn default_summary_interval() -> f64 {
    5.0
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub name: String,

    /// Shadow a (demo) physical car instead of driving purely simulated
    #[serde(default)]
    pub physical: Option<PhysicalCarConfig>,

    #[serde(default)]
    pub starting_offset_mm: f64,

    #[serde(default)]
    pub speed_percent: f64,

    /// Lane in lane widths right of center
    #[serde(default)]
    pub lane: i32,
}

/// Where the demo physical car really starts; the simulation has to find it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalCarConfig {
    #[serde(default)]
    pub start_piece: usize,

    /// Drive against the track's piece order
    #[serde(default)]
    pub reversed: bool,
}

impl RunnerConfig {
    /// Load from the CLI argument or environment, falling back to the demo
    pub fn from_env() -> Result<Self> {
        let path = std::env::args()
            .nth(1)
            .or_else(|| std::env::var(CONFIG_ENV).ok());
        match path {
            Some(path) => Self::load(Path::new(&path)),
            None => {
                tracing::info!("No config given, using built-in demo");
                Self::demo()
            }
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Oval with one simulated car and one demo physical car
    pub fn demo() -> Result<Self> {
        Self::from_json(DEMO_CONFIG).context("Built-in demo config is invalid")
    }
}

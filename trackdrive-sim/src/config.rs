//! Simulator configuration
//!
//! Every field has a default so partially specified JSON is accepted.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Tick loop frequency
    pub ticks_per_second: f64,

    /// Rated top speed, the 100% reference for `set_speed_percent`
    pub max_speed_mm_s: f64,

    /// Acceleration used by percent speed changes
    pub acceleration_mm_s2: f64,

    /// Distance between adjacent lanes
    pub lane_width_mm: f64,

    /// Largest lateral offset a lane change may target
    pub max_offset_mm: f64,

    pub uturn: UTurnConfig,

    pub fusion: FusionConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 30.0,
            max_speed_mm_s: 1200.0,
            acceleration_mm_s2: 1000.0,
            lane_width_mm: 23.0,
            max_offset_mm: 68.0,
            uturn: UTurnConfig::default(),
            fusion: FusionConfig::default(),
        }
    }
}

impl SimulatorConfig {
    pub fn with_ticks_per_second(mut self, ticks_per_second: f64) -> Self {
        self.ticks_per_second = ticks_per_second;
        self
    }
}

/// U-turn maneuver parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UTurnConfig {
    /// Speed held through the semicircle
    pub speed_mm_s: f64,

    /// Semicircle radius; the lateral shift of a full maneuver is twice this
    pub radius_mm: f64,

    /// Rate at which speed approaches `speed_mm_s` before the turn starts
    pub deceleration_mm_s2: f64,

    /// Speed difference accepted as "at maneuver speed"
    pub speed_tolerance_mm_s: f64,
}

impl Default for UTurnConfig {
    fn default() -> Self {
        Self {
            speed_mm_s: 150.0,
            radius_mm: 34.0,
            deceleration_mm_s2: 1500.0,
            speed_tolerance_mm_s: 1.0,
        }
    }
}

/// Physical telemetry fusion parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Weight of the newest sample in the speed correction filter
    pub correction_alpha: f64,

    /// Target speeds below this receive no correction
    pub low_speed_threshold_mm_s: f64,

    /// Delay between a physical transition and its event reaching us
    pub latency_s: f64,

    /// Time over which a position discrepancy should be closed
    pub correction_horizon_s: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            correction_alpha: 0.3,
            low_speed_threshold_mm_s: 100.0,
            latency_s: 0.05,
            correction_horizon_s: 1.0,
        }
    }
}

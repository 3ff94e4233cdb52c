//! Location service for physical vehicles
//!
//! A [`PhysicalLocationService`] is a [`LocationService`] that feeds the
//! fusion layer every simulator state carries. Telemetry ingestion takes the
//! same lock as the tick loop, so history updates, direction flips and speed correction never
//! race with a tick.

use crate::config::SimulatorConfig;
use crate::fusion::{FusionSnapshot, FusionState, LocationOutcome, Resolution};
use crate::simulator::{LocationService, MotionState};
use std::ops::Deref;
use std::sync::Arc;
use trackdrive_core::{FullTrack, PhysicalId};

pub struct PhysicalLocationService {
    inner: LocationService,
}

impl PhysicalLocationService {
    pub fn new(track: Arc<FullTrack>, config: SimulatorConfig, starting_offset: f64) -> Self {
        Self {
            inner: LocationService::new(track, config, starting_offset),
        }
    }

    /// Record a location report from the car
    ///
    /// `offset_mm` is measured from the road center, positive to the right of
    /// the car's driving direction.
    pub fn notify_location_event(
        &self,
        piece_id: PhysicalId,
        location: u8,
        offset_mm: f64,
        speed_mm_s: f64,
    ) -> LocationOutcome {
        self.with_fusion(|fusion, motion, track| {
            fusion.on_location(motion, track, piece_id, location, offset_mm, speed_mm_s)
        })
    }

    /// Record a piece transition reported by the car
    ///
    /// Returns the simulated-versus-reported position gap when the physical
    /// piece is already known.
    pub fn notify_transition_event(&self, offset_mm: f64) -> Option<f64> {
        self.with_fusion(|fusion, motion, track| fusion.on_transition(motion, track, offset_mm))
    }

    /// Re-run alignment resolution against the current history
    pub fn find_physical_location(&self) -> Resolution {
        self.with_fusion(|fusion, motion, track| fusion.resolve(motion, track))
    }

    pub fn fusion_snapshot(&self) -> FusionSnapshot {
        self.with_fusion(|fusion, _, _| fusion.snapshot())
    }

    pub fn speed_correction(&self) -> f64 {
        self.with_fusion(|fusion, _, _| fusion.correction())
    }

    fn with_fusion<R>(
        &self,
        f: impl FnOnce(&mut FusionState, &mut MotionState, &FullTrack) -> R,
    ) -> R {
        self.inner
            .with_state(|state, track, _| f(&mut state.fusion, &mut state.motion, track))
    }
}

impl Deref for PhysicalLocationService {
    type Target = LocationService;

    fn deref(&self) -> &LocationService {
        &self.inner
    }
}

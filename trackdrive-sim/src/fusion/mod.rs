//! Physical telemetry fusion
//!
//! Reconciles a simulator's optimistic motion with sparse reports from a
//! physical car:
//! - location reports record the observed piece id into a [`PieceHistory`]
//!   and trigger alignment resolution
//! - transition reports advance the history cursor and, once the physical
//!   piece is known, feed the gap between simulated and reported position
//!   into an exponentially filtered speed correction
//!
//! The state here lives inside the simulator lock; every entry point takes
//! the motion state it mutates explicitly.

mod history;

pub use history::PieceHistory;

use crate::config::{FusionConfig, SimulatorConfig};
use crate::simulator::MotionState;
use tracing::{debug, info, warn};
use trackdrive_core::{FullTrack, PhysicalId};

/// Result of trying to align the history with the track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Exactly one alignment matched; the car is on `piece_index`
    Resolved { piece_index: usize, reversed: bool },
    /// Several alignments still match; waiting for more reports
    Ambiguous { candidates: usize },
    /// Nothing matched; the history was reset
    NoMatch,
}

/// Result of ingesting a location report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationOutcome {
    /// The reported id is not on this track; nothing changed
    UnknownPiece(PhysicalId),
    /// Recorded; `reset` is set when it contradicted the history
    Recorded { reset: bool, resolution: Resolution },
}

/// Point-in-time copy of the fusion state
#[derive(Debug, Clone, PartialEq)]
pub struct FusionSnapshot {
    pub history: PieceHistory,
    pub physical_index: Option<usize>,
    pub correction: f64,
    pub last_location: Option<u8>,
}

#[derive(Debug, Clone)]
pub(crate) struct FusionState {
    config: FusionConfig,
    max_offset_mm: f64,
    history: PieceHistory,
    /// Track index of the physical car, once resolved
    physical_index: Option<usize>,
    /// Signed speed correction in mm/s
    correction: f64,
    last_location: Option<u8>,
}

impl FusionState {
    pub fn new(track_len: usize, config: &SimulatorConfig) -> Self {
        Self {
            config: config.fusion.clone(),
            max_offset_mm: config.max_offset_mm,
            history: PieceHistory::new(track_len),
            physical_index: None,
            correction: 0.0,
            last_location: None,
        }
    }

    pub fn correction(&self) -> f64 {
        self.correction
    }

    pub fn snapshot(&self) -> FusionSnapshot {
        FusionSnapshot {
            history: self.history.clone(),
            physical_index: self.physical_index,
            correction: self.correction,
            last_location: self.last_location,
        }
    }

    /// Ingest a location report
    ///
    /// `offset_mm` is relative to the car's driving direction.
    pub fn on_location(
        &mut self,
        motion: &mut MotionState,
        track: &FullTrack,
        piece_id: PhysicalId,
        location: u8,
        offset_mm: f64,
        speed_mm_s: f64,
    ) -> LocationOutcome {
        if !track.contains_physical(piece_id) {
            warn!(piece_id, location, "Location report for a piece not on this track, ignoring");
            return LocationOutcome::UnknownPiece(piece_id);
        }

        let offset = offset_mm.clamp(-self.max_offset_mm, self.max_offset_mm);
        motion.target_offset = offset * f64::from(motion.direction);
        motion.target_speed = speed_mm_s.max(0.0);
        self.last_location = Some(location);

        let reset = self.history.record(piece_id);
        if reset {
            warn!(
                piece_id,
                cursor = self.history.cursor(),
                "Piece history contradicted, resetting"
            );
            self.lose_lock();
        }

        let resolution = self.resolve(motion, track);
        LocationOutcome::Recorded { reset, resolution }
    }

    /// Ingest a transition report; returns the position gap that fed the
    /// speed correction, if the physical piece is known
    pub fn on_transition(
        &mut self,
        motion: &MotionState,
        track: &FullTrack,
        offset_mm: f64,
    ) -> Option<f64> {
        let direction = motion.direction;
        self.history.advance(direction);

        let physical = self.physical_index?;
        let entered = track.index_step(physical, i64::from(direction));
        let offset = offset_mm * f64::from(direction);

        // Where the car is now: just past the start of the entered piece,
        // projected forward by the reporting latency
        let length = track.piece(entered).length(offset);
        let travelled = (motion.actual_speed * self.config.latency_s).min(length);
        let reported = if direction > 0 {
            travelled
        } else {
            length - travelled
        };

        let simulated = track.piece(motion.piece_index).equivalent_progress_for_offset(
            motion.actual_offset,
            offset,
            motion.progress,
        );
        let gap = track.signed_gap(
            (motion.piece_index, simulated),
            (entered, reported),
            offset,
            direction,
        );

        let instantaneous = gap / self.config.correction_horizon_s;
        let alpha = self.config.correction_alpha;
        self.correction = alpha * instantaneous + (1.0 - alpha) * self.correction;
        self.physical_index = Some(entered);

        debug!(
            piece = entered,
            gap,
            correction = self.correction,
            "Transition folded into speed correction"
        );
        Some(gap)
    }

    /// Match the history against the track and adopt a unique alignment
    pub fn resolve(&mut self, motion: &mut MotionState, track: &FullTrack) -> Resolution {
        let candidates = self.history.candidates(track);
        match candidates.as_slice() {
            [] => {
                warn!("Piece history matches no alignment, resetting");
                self.history.reset();
                self.lose_lock();
                Resolution::NoMatch
            }
            &[(offset, reading)] => {
                let piece_index =
                    self.history
                        .track_index(track, self.history.cursor(), offset, reading);
                let reversed = reading < 0;
                self.history.reindex(track, offset, reading);

                if reversed {
                    self.reverse(motion, track);
                }
                // Snap only when the match disagrees with the tracked piece
                if reversed || self.physical_index != Some(piece_index) {
                    self.snap(motion, track, piece_index);
                    info!(piece_index, reversed, "Physical location resolved");
                }
                self.physical_index = Some(piece_index);
                Resolution::Resolved {
                    piece_index,
                    reversed,
                }
            }
            many => {
                debug!(candidates = many.len(), "Physical location still ambiguous");
                Resolution::Ambiguous {
                    candidates: many.len(),
                }
            }
        }
    }

    /// Forget the tracked physical piece and its correction
    fn lose_lock(&mut self) {
        if self.physical_index.take().is_some() {
            info!("Physical location lost");
        }
        self.correction = 0.0;
    }

    /// The car drives against our direction multiplier: turn the simulation
    /// around while keeping its driving-frame lane
    fn reverse(&mut self, motion: &mut MotionState, track: &FullTrack) {
        motion.direction = -motion.direction;
        motion.target_offset = -motion.target_offset;
        motion.apply_offset(track, -motion.actual_offset);
        self.correction = 0.0;
    }

    /// Jump the simulation to the entry of the physical piece
    fn snap(&self, motion: &mut MotionState, track: &FullTrack, piece_index: usize) {
        if motion.piece_index == piece_index {
            return;
        }
        motion.piece_index = piece_index;
        motion.progress = if motion.direction > 0 {
            0.0
        } else {
            track.piece(piece_index).length(motion.actual_offset)
        };
    }
}

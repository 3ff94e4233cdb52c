//! Demo driver that plays a physical car without hardware
//!
//! A ground-truth [`LocationService`] drives the track and is stepped once per
//! poll. Whenever it enters a new piece the driver reports what a real car
//! would: a transition, then a location read carrying the piece's physical
//! id, the lane offset and a slightly noisy speed.

use crate::config::SimulatorConfig;
use crate::driver::{DriverEvent, VehicleDriver};
use crate::simulator::{LocationService, MotionSnapshot};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, trace};
use trackdrive_core::FullTrack;

/// Simple deterministic noise from a seed
fn noise(seed: f64) -> f64 {
    let x = (seed * 12.9898 + 78.233).sin() * 43_758.547;
    x - x.floor()
}

/// Small jitter centered around 0
fn jitter(seed: f64, amplitude: f64) -> f64 {
    (noise(seed) - 0.5) * 2.0 * amplitude
}

pub struct DemoDriver {
    truth: LocationService,
    frame_count: u64,
    /// Piece the truth was on at the previous poll; None before the first
    last_piece: Option<usize>,
    location_counter: u8,
    speed_jitter_mm_s: f64,
    offset_jitter_mm: f64,
}

impl DemoDriver {
    /// Create a demo car on `piece_index`, travelling in `direction`
    pub fn new(
        track: Arc<FullTrack>,
        config: SimulatorConfig,
        starting_offset: f64,
        piece_index: usize,
        direction: i8,
    ) -> Self {
        // Backward travel starts at the piece's far end
        let progress = if direction < 0 {
            track.piece(piece_index).length(starting_offset)
        } else {
            0.0
        };
        let truth = LocationService::new(track, config, starting_offset);
        truth.place(piece_index, progress, direction);
        Self {
            truth,
            frame_count: 0,
            last_piece: None,
            location_counter: 0,
            speed_jitter_mm_s: 5.0,
            offset_jitter_mm: 0.5,
        }
    }

    /// Override the noise added to reported speed and offset
    pub fn with_jitter(mut self, speed_mm_s: f64, offset_mm: f64) -> Self {
        self.speed_jitter_mm_s = speed_mm_s;
        self.offset_jitter_mm = offset_mm;
        self
    }

    /// Where the demo car really is
    pub fn ground_truth(&self) -> MotionSnapshot {
        self.truth.snapshot()
    }

    fn location_event(&mut self, piece_index: usize, truth: &MotionSnapshot) -> Option<DriverEvent> {
        let piece_id = self.truth.track().piece(piece_index).physical_id?;
        let n = self.frame_count as f64;
        self.location_counter = self.location_counter.wrapping_add(1);
        Some(DriverEvent::Location {
            location: self.location_counter,
            piece_id,
            offset_mm: driving_offset(truth) + jitter(n * 1.1, self.offset_jitter_mm),
            speed_mm_s: (truth.target_speed + jitter(n * 1.2, self.speed_jitter_mm_s)).max(0.0),
            reversed: reversed(truth),
        })
    }

    /// Transition events for every piece boundary crossed between `from` and
    /// `to`, followed by a location read on the final piece
    fn crossing_events(&mut self, from: usize, to: usize, truth: &MotionSnapshot) -> Vec<DriverEvent> {
        let track = Arc::clone(self.truth.track());
        let step = i64::from(truth.direction);
        let mut events = Vec::new();
        let mut current = from;
        for _ in 0..track.len() {
            if current == to {
                break;
            }
            let next = track.index_step(current, step);
            if let (Some(prev_piece_id), Some(piece_id)) =
                (track.piece(current).physical_id, track.piece(next).physical_id)
            {
                events.push(DriverEvent::Transition {
                    piece_id,
                    prev_piece_id,
                    offset_mm: driving_offset(truth),
                    reversed: reversed(truth),
                });
            }
            current = next;
        }
        events.extend(self.location_event(to, truth));
        events
    }
}

fn driving_offset(truth: &MotionSnapshot) -> f64 {
    truth.actual_offset * f64::from(truth.direction)
}

/// The car drives against the track's piece order
fn reversed(truth: &MotionSnapshot) -> bool {
    truth.direction < 0
}

impl VehicleDriver for DemoDriver {
    fn name(&self) -> &str {
        "Demo"
    }

    fn change_speed(&mut self, speed_mm_s: f64, acceleration_mm_s2: f64) -> Result<()> {
        self.truth.set_speed(speed_mm_s, acceleration_mm_s2);
        Ok(())
    }

    fn change_lane(&mut self, offset_mm: f64) -> Result<()> {
        self.truth.set_target_offset(offset_mm);
        Ok(())
    }

    fn do_turn(&mut self) -> Result<()> {
        if !self.truth.do_uturn() {
            debug!("Demo car already turning");
        }
        Ok(())
    }

    fn poll_events(&mut self) -> Result<Vec<DriverEvent>> {
        self.frame_count += 1;
        if self.truth.tick().is_none() {
            return Ok(Vec::new());
        }
        let truth = self.truth.snapshot();

        let events = match self.last_piece {
            None => self.location_event(truth.piece_index, &truth).into_iter().collect(),
            Some(previous) if previous != truth.piece_index => {
                self.crossing_events(previous, truth.piece_index, &truth)
            }
            Some(_) => Vec::new(),
        };
        self.last_piece = Some(truth.piece_index);

        if !events.is_empty() {
            trace!(count = events.len(), piece = truth.piece_index, "Demo events");
        }
        Ok(events)
    }
}

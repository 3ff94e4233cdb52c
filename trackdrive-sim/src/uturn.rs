//! U-turn maneuver
//!
//! While installed, a [`UTurn`] decides each tick's travel distance instead
//! of the normal accelerate/shift logic:
//! - decelerate (or accelerate) to the maneuver speed
//! - first half: walk a point a quarter of the way around a semicircle
//! - second half: flip the direction multiplier, walk the remaining quarter
//!
//! The semicircle's along-track component becomes travel distance and its
//! lateral component becomes lane offset. The maneuver turns toward the side
//! of the road with more room, so the full 2r lateral shift stays on track.

use crate::config::SimulatorConfig;
use crate::simulator::MotionState;
use std::f64::consts::PI;
use tracing::debug;
use trackdrive_core::FullTrack;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Decelerate,
    FirstHalf,
    SecondHalf,
}

/// Outcome of one maneuver tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct UTurnStep {
    /// Unsigned travel distance along the (current) driving direction
    pub distance: f64,
    /// The arc closed; normal ticking resumes next tick
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct UTurn {
    phase: Phase,
    /// Degrees travelled around the semicircle, 0..=180
    arc_degrees: f64,
    degrees_per_tick: f64,
    radius: f64,
    /// +1 turns right of the original driving direction, -1 left
    side: f64,
    /// Direction multiplier when the maneuver started
    origin_direction: i8,
    flipped: bool,
}

impl UTurn {
    pub fn new(motion: &MotionState, config: &SimulatorConfig) -> Self {
        let radius = config.uturn.radius_mm;
        let circumference = 2.0 * PI * radius;
        let distance_per_tick = config.uturn.speed_mm_s / config.ticks_per_second;
        let side = if motion.driving_offset() > 0.0 { -1.0 } else { 1.0 };
        debug!(
            side,
            offset = motion.actual_offset,
            direction = motion.direction,
            "U-turn requested"
        );
        Self {
            phase: Phase::Decelerate,
            arc_degrees: 0.0,
            degrees_per_tick: 360.0 * distance_per_tick / circumference,
            radius,
            side,
            origin_direction: motion.direction,
            flipped: false,
        }
    }

    pub fn step(
        &mut self,
        motion: &mut MotionState,
        track: &FullTrack,
        config: &SimulatorConfig,
    ) -> UTurnStep {
        let tps = config.ticks_per_second;
        match self.phase {
            Phase::Decelerate => {
                let target = config.uturn.speed_mm_s;
                let rate = config.uturn.deceleration_mm_s2.max(motion.acceleration);
                motion.approach_speed(target, rate, tps);
                if (motion.actual_speed - target).abs() <= config.uturn.speed_tolerance_mm_s {
                    motion.actual_speed = target;
                    self.phase = Phase::FirstHalf;
                }
                UTurnStep {
                    distance: motion.actual_speed / tps,
                    finished: false,
                }
            }
            Phase::FirstHalf => {
                let next = (self.arc_degrees + self.degrees_per_tick).min(90.0);
                let distance = self.walk_arc(motion, track, next);
                if next >= 90.0 {
                    self.phase = Phase::SecondHalf;
                }
                UTurnStep {
                    distance,
                    finished: false,
                }
            }
            Phase::SecondHalf => {
                if !self.flipped {
                    motion.direction = -motion.direction;
                    self.flipped = true;
                }
                let mut next = self.arc_degrees + self.degrees_per_tick;
                // Forward component crossing zero means the arc has closed
                let closed = next >= 180.0 || arc_point(next, self.radius).0 <= 0.0;
                if closed {
                    next = 180.0;
                }
                let distance = self.walk_arc(motion, track, next);
                if closed {
                    motion.target_offset = motion.actual_offset;
                }
                UTurnStep {
                    distance,
                    finished: closed,
                }
            }
        }
    }

    /// Move the arc point to `next` degrees, applying the lateral change as
    /// offset and returning the along-track change
    fn walk_arc(&mut self, motion: &mut MotionState, track: &FullTrack, next: f64) -> f64 {
        let (old_forward, old_lateral) = arc_point(self.arc_degrees, self.radius);
        let (new_forward, new_lateral) = arc_point(next, self.radius);
        self.arc_degrees = next;

        let lateral = (new_lateral - old_lateral) * self.side * f64::from(self.origin_direction);
        motion.apply_offset(track, motion.actual_offset + lateral);
        (new_forward - old_forward).abs()
    }
}

/// (forward, lateral) displacement after `degrees` around a semicircle
/// that starts heading forward
fn arc_point(degrees: f64, radius: f64) -> (f64, f64) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    (radius * sin, radius * (1.0 - cos))
}

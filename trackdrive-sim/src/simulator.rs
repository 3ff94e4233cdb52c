//! Continuous motion simulator
//!
//! A [`LocationService`] keeps one vehicle's virtual position on a
//! [`FullTrack`]. A background thread ticks it at a fixed rate; every tick:
//! - accelerates the actual speed toward the target speed (or lets an active
//!   U-turn decide the tick's travel distance)
//! - shifts the lateral offset toward its target, trading some forward travel
//! - advances progress along the current piece, rolling leftover distance
//!   onto neighbouring pieces
//! - publishes a [`PositionUpdate`] on a broadcast channel and to the
//!   registered callback, after the state lock has been released
//!
//! All state lives behind a single mutex shared by the setters, the tick
//! loop and the physical fusion layer.

use crate::config::SimulatorConfig;
use crate::error::{Result, SimError};
use crate::fusion::FusionState;
use crate::uturn::UTurn;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace};
use trackdrive_core::units::{Millimeters, MillimetersPerSecond, SpeedPercent};
use trackdrive_core::{Angle, FullTrack, MotionTelemetry, PositionUpdate, Vector};

/// Share of a tick's travel that may be spent moving sideways
const OFFSET_SHIFT_RATIO: f64 = 0.3;

/// Capacity of the position update channel
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Callback invoked once per tick with the new position
pub type UpdateCallback = Arc<dyn Fn(&PositionUpdate) + Send + Sync>;

/// Speed, offset and track position of one vehicle
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct MotionState {
    pub actual_speed: f64,
    pub target_speed: f64,
    pub acceleration: f64,
    /// Piece-frame lateral offset
    pub actual_offset: f64,
    pub target_offset: f64,
    /// +1 while traversing piece indices forward, -1 backward
    pub direction: i8,
    pub piece_index: usize,
    pub progress: f64,
}

impl MotionState {
    fn new(starting_offset: f64, acceleration: f64) -> Self {
        Self {
            actual_speed: 0.0,
            target_speed: 0.0,
            acceleration,
            actual_offset: starting_offset,
            target_offset: starting_offset,
            direction: 1,
            piece_index: 0,
            progress: 0.0,
        }
    }

    /// Move the actual speed toward `target` by at most `rate / ticks_per_second`
    pub fn approach_speed(&mut self, target: f64, rate: f64, ticks_per_second: f64) {
        let step = rate.abs() / ticks_per_second;
        self.actual_speed = if self.actual_speed < target {
            (self.actual_speed + step).min(target)
        } else {
            (self.actual_speed - step).max(target)
        };
    }

    /// Change the actual offset, keeping the fraction of the piece completed
    pub fn apply_offset(&mut self, track: &FullTrack, new_offset: f64) {
        let piece = track.piece(self.piece_index);
        self.progress =
            piece.equivalent_progress_for_offset(self.actual_offset, new_offset, self.progress);
        self.actual_offset = new_offset;
    }

    /// Shift toward the target offset and return the remaining forward travel
    fn shift_offset(&mut self, track: &FullTrack, ticks_per_second: f64) -> f64 {
        let distance = self.actual_speed / ticks_per_second;
        if !distance.is_finite() {
            return distance;
        }
        let max_shift = distance * OFFSET_SHIFT_RATIO;
        let change = (self.target_offset - self.actual_offset).clamp(-max_shift, max_shift);
        if change == 0.0 {
            return distance;
        }
        self.apply_offset(track, self.actual_offset + change);
        (distance * distance - change * change).max(0.0).sqrt()
    }

    /// Offset relative to the current driving direction
    pub fn driving_offset(&self) -> f64 {
        self.actual_offset * f64::from(self.direction)
    }
}

/// Everything guarded by the simulator lock
pub(crate) struct SimulatorState {
    pub motion: MotionState,
    pub uturn: Option<UTurn>,
    /// Only fed by physical services; stays at zero correction otherwise
    pub fusion: FusionState,
    position: Vector,
    angle: Angle,
    tick: u64,
}

impl SimulatorState {
    fn new(track: &FullTrack, config: &SimulatorConfig, motion: MotionState) -> Self {
        let mut state = Self {
            motion,
            uturn: None,
            fusion: FusionState::new(track.len(), config),
            position: Vector::ZERO,
            angle: Angle::UP,
            tick: 0,
        };
        state.reset_pose(track);
        state
    }

    /// Recompute position and heading from the piece index and progress
    pub fn reset_pose(&mut self, track: &FullTrack) {
        let m = &self.motion;
        let piece = track.piece(m.piece_index);
        let local = piece.process(m.progress, 0.0, m.actual_offset).position;
        self.position = track.to_global(m.piece_index, local);
        let heading = f64::from(piece.incoming().degrees());
        self.angle = if m.direction > 0 {
            Angle::from_degrees(heading)
        } else {
            Angle::from_degrees(heading + 180.0)
        };
    }

    fn effective_target_speed(&self, config: &SimulatorConfig) -> f64 {
        let target = self.motion.target_speed;
        if target < config.fusion.low_speed_threshold_mm_s {
            return target;
        }
        (target + self.fusion.correction()).max(0.0)
    }

    /// Run one tick and build the resulting update
    fn step(&mut self, track: &FullTrack, config: &SimulatorConfig) -> Result<PositionUpdate> {
        let tps = config.ticks_per_second;
        let distance = match self.uturn.take() {
            Some(mut uturn) => {
                let step = uturn.step(&mut self.motion, track, config);
                if step.finished {
                    debug!(
                        offset = self.motion.actual_offset,
                        direction = self.motion.direction,
                        "U-turn complete"
                    );
                } else {
                    self.uturn = Some(uturn);
                }
                step.distance
            }
            None => {
                let target = self.effective_target_speed(config);
                let rate = self.motion.acceleration;
                self.motion.approach_speed(target, rate, tps);
                self.motion.shift_offset(track, tps)
            }
        };

        let position = self.advance(track, distance)?;
        if let Some(angle) = Angle::between(&self.position, &position) {
            self.angle = angle;
        }
        self.position = position;
        self.tick += 1;

        trace!(
            tick = self.tick,
            piece = self.motion.piece_index,
            progress = self.motion.progress,
            speed = self.motion.actual_speed,
            "Tick"
        );
        Ok(self.update(track))
    }

    /// Move `distance` along the track in the driving direction
    ///
    /// Leftover distance rolls onto the next (or previous) piece. On a fault
    /// the piece index and progress are restored and the previous pose kept.
    fn advance(&mut self, track: &FullTrack, distance: f64) -> Result<Vector> {
        if !distance.is_finite() {
            return Err(SimError::NonFiniteDistance(distance));
        }

        let direction = self.motion.direction;
        let offset = self.motion.actual_offset;
        let saved = (self.motion.piece_index, self.motion.progress);

        let shortest = track
            .pieces()
            .map(|p| p.length(offset))
            .fold(f64::INFINITY, f64::min);
        let max_crossings = (distance.abs() / shortest).ceil() as usize + 1;

        let mut remaining = distance * f64::from(direction);
        for _ in 0..=max_crossings {
            let index = self.motion.piece_index;
            let advance = track
                .piece(index)
                .process(self.motion.progress, remaining, offset);
            self.motion.progress = advance.progress;

            if advance.leftover == 0.0 {
                return Ok(track.to_global(index, advance.position));
            }
            if advance.leftover.signum() != f64::from(direction) {
                (self.motion.piece_index, self.motion.progress) = saved;
                return Err(SimError::ImpossibleDirection {
                    leftover: advance.leftover,
                    direction,
                });
            }

            if advance.leftover > 0.0 {
                self.motion.piece_index = track.index_step(index, 1);
                self.motion.progress = 0.0;
            } else {
                self.motion.piece_index = track.index_step(index, -1);
                self.motion.progress = track.piece(self.motion.piece_index).length(offset);
            }
            remaining = advance.leftover;
        }

        (self.motion.piece_index, self.motion.progress) = saved;
        Err(SimError::RollOverLimit(max_crossings))
    }

    fn update(&self, track: &FullTrack) -> PositionUpdate {
        let m = &self.motion;
        PositionUpdate {
            timestamp: Utc::now(),
            tick: self.tick,
            position: self.position,
            angle: self.angle,
            piece_index: m.piece_index,
            progress: Millimeters(m.progress),
            telemetry: MotionTelemetry {
                offset: Millimeters(m.driving_offset()),
                speed: MillimetersPerSecond(m.actual_speed),
                going_clockwise: track.nominal_clockwise() == (m.direction > 0),
                uturn_in_progress: self.uturn.is_some(),
            },
        }
    }

    fn snapshot(&self) -> MotionSnapshot {
        let m = &self.motion;
        MotionSnapshot {
            piece_index: m.piece_index,
            progress: m.progress,
            actual_speed: m.actual_speed,
            target_speed: m.target_speed,
            acceleration: m.acceleration,
            actual_offset: m.actual_offset,
            target_offset: m.target_offset,
            direction: m.direction,
            uturn_in_progress: self.uturn.is_some(),
            position: self.position,
            angle: self.angle,
            tick: self.tick,
        }
    }
}

/// Point-in-time copy of a simulator's state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSnapshot {
    pub piece_index: usize,
    pub progress: f64,
    pub actual_speed: f64,
    pub target_speed: f64,
    pub acceleration: f64,
    /// Piece-frame offset, positive = right of the nominal direction
    pub actual_offset: f64,
    pub target_offset: f64,
    pub direction: i8,
    pub uturn_in_progress: bool,
    pub position: Vector,
    pub angle: Angle,
    pub tick: u64,
}

struct Shared {
    track: Arc<FullTrack>,
    config: SimulatorConfig,
    state: Mutex<SimulatorState>,
    callback: Mutex<Option<UpdateCallback>>,
    updates: broadcast::Sender<PositionUpdate>,
    running: AtomicBool,
}

impl Shared {
    fn tick(&self) -> Option<PositionUpdate> {
        let result = {
            let mut state = self.state.lock();
            state.step(&self.track, &self.config)
        };

        match result {
            Ok(update) => {
                // Ignore error if no receivers (they'll get the next update)
                let _ = self.updates.send(update.clone());
                let callback = self.callback.lock().clone();
                if let Some(callback) = callback {
                    callback(&update);
                }
                Some(update)
            }
            Err(e) => {
                error!("Simulator fault, holding previous position: {}", e);
                None
            }
        }
    }

    fn run(&self, period: Duration) {
        let mut next = Instant::now();
        while self.running.load(Ordering::Acquire) {
            self.tick();
            next += period;
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            } else {
                // Fell behind; don't try to catch up with a burst of ticks
                next = now;
            }
        }
    }
}

/// Tick-driven virtual position of one vehicle
pub struct LocationService {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LocationService {
    pub fn new(track: Arc<FullTrack>, config: SimulatorConfig, starting_offset: f64) -> Self {
        let motion = MotionState::new(starting_offset, config.acceleration_mm_s2);
        let state = SimulatorState::new(&track, &config, motion);
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                track,
                config,
                state: Mutex::new(state),
                callback: Mutex::new(None),
                updates,
                running: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Create a simulator ticking `ticks_per_second` times, optionally started
    pub fn create(
        track: Arc<FullTrack>,
        ticks_per_second: f64,
        starting_offset: f64,
        start_immediately: bool,
    ) -> Result<Self> {
        let config = SimulatorConfig::default().with_ticks_per_second(ticks_per_second);
        let service = Self::new(track, config, starting_offset);
        if start_immediately {
            service.start()?;
        }
        Ok(service)
    }

    pub fn track(&self) -> &Arc<FullTrack> {
        &self.shared.track
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.shared.config
    }

    /// Run `f` with the state lock held
    pub(crate) fn with_state<R>(
        &self,
        f: impl FnOnce(&mut SimulatorState, &FullTrack, &SimulatorConfig) -> R,
    ) -> R {
        let mut state = self.shared.state.lock();
        f(&mut state, &self.shared.track, &self.shared.config)
    }

    /// Set the target speed as a percentage of the rated maximum
    pub fn set_speed_percent(&self, percent: f64) {
        let max = MillimetersPerSecond(self.shared.config.max_speed_mm_s);
        let speed = SpeedPercent::new(percent).of(max);
        self.set_speed(speed.0, self.shared.config.acceleration_mm_s2);
    }

    /// Set the target speed and the acceleration used to reach it
    pub fn set_speed(&self, speed_mm_s: f64, acceleration_mm_s2: f64) {
        self.with_state(|state, _, _| {
            state.motion.target_speed = speed_mm_s.max(0.0);
            state.motion.acceleration = acceleration_mm_s2.abs();
        });
    }

    /// Target a lane, counted in lane widths right of center (negative = left)
    ///
    /// Ignored while a U-turn is in progress.
    pub fn set_offset_lane(&self, lane: i32) {
        self.set_target_offset(f64::from(lane) * self.shared.config.lane_width_mm);
    }

    /// Target an offset from road center, positive = right of the driving
    /// direction, clamped to the configured maximum
    ///
    /// Ignored while a U-turn is in progress.
    pub fn set_target_offset(&self, offset_mm: f64) {
        self.with_state(|state, _, config| {
            if state.uturn.is_some() {
                debug!(offset_mm, "Lane change ignored during U-turn");
                return;
            }
            let offset = offset_mm.clamp(-config.max_offset_mm, config.max_offset_mm);
            state.motion.target_offset = offset * f64::from(state.motion.direction);
        });
    }

    /// Start a U-turn; returns false if one is already running
    pub fn do_uturn(&self) -> bool {
        self.with_state(|state, _, config| {
            if state.uturn.is_some() {
                debug!("U-turn already in progress");
                return false;
            }
            state.uturn = Some(UTurn::new(&state.motion, config));
            true
        })
    }

    /// Move the vehicle to `progress` on piece `piece_index`
    pub fn place(&self, piece_index: usize, progress: f64, direction: i8) {
        self.with_state(|state, track, _| {
            let index = piece_index % track.len();
            let length = track.piece(index).length(state.motion.actual_offset);
            state.motion.piece_index = index;
            state.motion.progress = progress.clamp(0.0, length);
            state.motion.direction = if direction < 0 { -1 } else { 1 };
            state.reset_pose(track);
        });
    }

    /// Replace the per-tick callback
    pub fn register_update_callback<F>(&self, callback: F)
    where
        F: Fn(&PositionUpdate) + Send + Sync + 'static,
    {
        *self.shared.callback.lock() = Some(Arc::new(callback));
    }

    /// Subscribe to position updates
    pub fn subscribe(&self) -> broadcast::Receiver<PositionUpdate> {
        self.shared.updates.subscribe()
    }

    pub fn snapshot(&self) -> MotionSnapshot {
        self.shared.state.lock().snapshot()
    }

    /// Run a single tick on the calling thread
    pub fn tick(&self) -> Option<PositionUpdate> {
        self.shared.tick()
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Start the background tick loop; no-op if already running
    pub fn start(&self) -> Result<()> {
        let tps = self.shared.config.ticks_per_second;
        let period = Duration::try_from_secs_f64(1.0 / tps)
            .ok()
            .filter(|period| !period.is_zero())
            .ok_or(SimError::InvalidTickRate(tps))?;
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("location-service".to_string())
            .spawn(move || shared.run(period));

        match spawned {
            Ok(handle) => {
                *self.worker.lock() = Some(handle);
                info!(
                    ticks_per_second = self.shared.config.ticks_per_second,
                    "Location service started"
                );
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                Err(SimError::Spawn(e))
            }
        }
    }

    /// Stop the tick loop and wait for it to exit
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        let Some(handle) = self.worker.lock().take() else {
            return;
        };
        // Called from inside a callback: the loop exits on its own
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            error!("Location service tick loop panicked");
        } else {
            info!("Location service stopped");
        }
    }
}

impl Drop for LocationService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackdrive_core::piece::STRAIGHT_LENGTH;

    fn straight_loop() -> Arc<FullTrack> {
        Arc::new(FullTrack::builder().straight(None).straight(None).build().unwrap())
    }

    fn service(track: Arc<FullTrack>, tps: f64) -> LocationService {
        LocationService::new(track, SimulatorConfig::default().with_ticks_per_second(tps), 0.0)
    }

    #[test]
    fn test_acceleration_never_overshoots() {
        let sim = service(straight_loop(), 10.0);
        sim.set_speed(105.0, 200.0);
        let speeds: Vec<f64> = (0..8)
            .map(|_| {
                sim.tick();
                sim.snapshot().actual_speed
            })
            .collect();
        assert_eq!(speeds[0], 20.0);
        assert_eq!(speeds[4], 100.0);
        assert_eq!(speeds[5], 105.0);
        assert_eq!(speeds[7], 105.0);
    }

    #[test]
    fn test_virtual_service_fusion_stays_idle() {
        let sim = service(straight_loop(), 10.0);
        sim.with_state(|state, track, _| {
            assert_eq!(state.fusion.correction(), 0.0);
            assert_eq!(state.fusion.snapshot().physical_index, None);
            assert_eq!(state.fusion.snapshot().history.len(), track.len());
        });
        sim.set_speed(500.0, 1e6);
        sim.tick();
        assert_eq!(sim.snapshot().actual_speed, 500.0);
    }

    #[test]
    fn test_deceleration_stops_at_zero() {
        let sim = service(straight_loop(), 10.0);
        sim.set_speed(50.0, 1e6);
        sim.tick();
        sim.set_speed(0.0, 100.0);
        for _ in 0..10 {
            sim.tick();
        }
        assert_eq!(sim.snapshot().actual_speed, 0.0);
    }

    #[test]
    fn test_offset_shift_is_limited_per_tick() {
        let sim = service(straight_loop(), 10.0);
        sim.set_speed(100.0, 1e6);
        sim.set_offset_lane(2);
        sim.tick();
        let snap = sim.snapshot();
        // 10mm of travel allows at most 3mm of lateral shift
        assert!((snap.actual_offset - 3.0).abs() < 1e-9);
        let forward = (10.0_f64 * 10.0 - 3.0 * 3.0).sqrt();
        assert!((snap.progress - forward).abs() < 1e-9);
    }

    #[test]
    fn test_lane_clamped_and_direction_relative() {
        let sim = service(straight_loop(), 10.0);
        sim.set_offset_lane(100);
        assert_eq!(sim.snapshot().target_offset, sim.config().max_offset_mm);

        sim.place(0, 10.0, -1);
        sim.set_offset_lane(1);
        assert_eq!(sim.snapshot().target_offset, -sim.config().lane_width_mm);
    }

    #[test]
    fn test_backward_travel_rolls_to_previous_piece() {
        let sim = service(straight_loop(), 10.0);
        sim.place(0, 5.0, -1);
        sim.set_speed(100.0, 1e6);
        sim.tick();
        let snap = sim.snapshot();
        assert_eq!(snap.piece_index, 1);
        assert!((snap.progress - (STRAIGHT_LENGTH - 5.0)).abs() < 1e-9);
    }

    #[test]
    fn test_heading_retained_while_stationary() {
        let sim = service(straight_loop(), 10.0);
        sim.set_speed(100.0, 1e6);
        sim.tick();
        let moving = sim.snapshot().angle;
        sim.set_speed(0.0, 1e6);
        sim.tick();
        sim.tick();
        assert_eq!(sim.snapshot().angle, moving);
    }

    #[test]
    fn test_nan_distance_holds_position() {
        let sim = service(straight_loop(), 10.0);
        sim.set_speed(100.0, 1e6);
        sim.tick();
        let before = sim.snapshot();
        sim.with_state(|state, _, _| {
            state.motion.actual_speed = f64::NAN;
            state.motion.target_speed = f64::NAN;
        });
        assert!(sim.tick().is_none());
        let after = sim.snapshot();
        assert_eq!(after.piece_index, before.piece_index);
        assert_eq!(after.progress, before.progress);
        assert_eq!(after.position, before.position);
    }

    #[test]
    fn test_contradicting_leftover_is_rejected() {
        let track = straight_loop();
        let sim = service(Arc::clone(&track), 10.0);
        sim.place(0, 5.0, 1);
        let result = sim.with_state(|state, track, _| state.advance(track, -20.0));
        assert!(matches!(result, Err(SimError::ImpossibleDirection { .. })));
        let snap = sim.snapshot();
        assert_eq!(snap.piece_index, 0);
        assert_eq!(snap.progress, 5.0);
    }

    #[test]
    fn test_start_rejects_invalid_tick_rate() {
        let sim = service(straight_loop(), 0.0);
        assert!(matches!(sim.start(), Err(SimError::InvalidTickRate(_))));
        assert!(!sim.is_running());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let sim = service(straight_loop(), 50.0);
        sim.stop();
        sim.start().unwrap();
        assert!(sim.is_running());
        sim.stop();
        sim.stop();
        assert!(!sim.is_running());
    }
}

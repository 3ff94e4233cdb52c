//! Fleet lifecycle manager
//!
//! This module handles:
//! - Starting every vehicle's tick loop
//! - Pumping driver telemetry into the fusion layer at the tick rate
//! - Logging position updates and a periodic status line per vehicle
//! - Stopping the fleet on Ctrl-C or after the configured run time

use crate::config::RunnerConfig;
use crate::fleet::Fleet;
use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};
use trackdrive_core::PositionUpdate;

/// Main manager loop; returns once the fleet has been stopped
pub async fn run(fleet: &mut Fleet, config: &RunnerConfig) -> Result<()> {
    let poll_period = period(1.0 / config.simulator.ticks_per_second)
        .context("ticks_per_second must be positive")?;
    let summary_period =
        period(config.summary_interval_secs).context("summary_interval_secs must be positive")?;
    let run_for = config
        .run_for_secs
        .map(|secs| period(secs).context("run_for_secs must be positive"))
        .transpose()?;

    fleet.start()?;
    let loggers: Vec<_> = fleet
        .vehicles()
        .iter()
        .map(|vehicle| {
            tokio::spawn(log_updates(
                vehicle.name().to_string(),
                vehicle.service().subscribe(),
            ))
        })
        .collect();

    info!("Fleet manager started");

    let mut poll = interval(poll_period);
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut summary = interval(summary_period);
    summary.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = async {
        match run_for {
            Some(duration) => sleep(duration).await,
            None => {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl-C: {}", e);
                }
            }
        }
    };
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = poll.tick() => pump_cycle(fleet),
            _ = summary.tick() => log_summary(fleet),
        }
    }

    info!("Stopping fleet");
    fleet.stop();
    for logger in loggers {
        logger.abort();
    }
    Ok(())
}

fn period(secs: f64) -> Result<Duration> {
    let duration = Duration::try_from_secs_f64(secs)?;
    if duration.is_zero() {
        anyhow::bail!("period rounds to zero: {}s", secs);
    }
    Ok(duration)
}

/// Feed every physical vehicle's pending telemetry into its simulation
fn pump_cycle(fleet: &mut Fleet) {
    for vehicle in fleet.vehicles_mut() {
        match vehicle.pump_events() {
            Ok(0) => {}
            Ok(count) => trace!(vehicle = vehicle.name(), count, "Driver events applied"),
            Err(e) => warn!("Error polling driver for {}: {}", vehicle.name(), e),
        }
    }
}

fn log_summary(fleet: &Fleet) {
    for vehicle in fleet.vehicles() {
        let snap = vehicle.service().snapshot();
        match vehicle.physical() {
            Some(physical) => {
                let fusion = physical.fusion_snapshot();
                info!(
                    vehicle = vehicle.name(),
                    piece = snap.piece_index,
                    progress = snap.progress,
                    speed = snap.actual_speed,
                    direction = snap.direction,
                    physical_piece = ?fusion.physical_index,
                    correction = fusion.correction,
                    "Vehicle status"
                );
            }
            None => {
                info!(
                    vehicle = vehicle.name(),
                    piece = snap.piece_index,
                    progress = snap.progress,
                    speed = snap.actual_speed,
                    direction = snap.direction,
                    "Vehicle status"
                );
            }
        }
    }
}

/// Drain one vehicle's position updates
async fn log_updates(name: String, mut rx: broadcast::Receiver<PositionUpdate>) {
    loop {
        match rx.recv().await {
            Ok(update) => match update.to_json() {
                Ok(json) => trace!(vehicle = %name, update = %json, "Position update"),
                Err(e) => warn!("Failed to serialize update for {}: {}", name, e),
            },
            Err(RecvError::Lagged(skipped)) => {
                debug!(vehicle = %name, skipped, "Update logger lagging");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

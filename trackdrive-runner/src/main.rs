//! TrackDrive Runner
//!
//! Loads a run configuration, puts its vehicles on the track and keeps them
//! moving until interrupted.

use anyhow::Result;
use trackdrive_runner::{config::RunnerConfig, fleet::Fleet, manager};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting TrackDrive runner");

    let config = RunnerConfig::from_env()?;
    let mut fleet = Fleet::from_config(&config)?;
    info!(
        pieces = fleet.track().len(),
        vehicles = fleet.vehicles().len(),
        "Fleet assembled"
    );

    manager::run(&mut fleet, &config).await?;

    fleet.stop();
    info!("TrackDrive runner stopped");
    Ok(())
}

//! Vehicles sharing one track

use crate::config::{RunnerConfig, VehicleConfig};
use anyhow::{Context, Result};
use std::sync::Arc;
use trackdrive_core::FullTrack;
use trackdrive_sim::{
    DemoDriver, LocationService, PhysicalLocationService, SimulatorConfig, Vehicle,
};
use tracing::{info, warn};

pub struct Fleet {
    track: Arc<FullTrack>,
    vehicles: Vec<Vehicle>,
}

impl Fleet {
    /// Build the track and every configured vehicle, with initial commands
    /// applied; tick loops are not started
    pub fn from_config(config: &RunnerConfig) -> Result<Self> {
        let track = FullTrack::from_records(config.track.clone()).context("Invalid track")?;
        if !track.is_geometrically_closed() {
            warn!("Track does not close geometrically; lap arithmetic still wraps");
        }
        let track = Arc::new(track);

        let vehicles = config
            .vehicles
            .iter()
            .map(|vehicle| build_vehicle(&track, &config.simulator, vehicle))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { track, vehicles })
    }

    pub fn track(&self) -> &Arc<FullTrack> {
        &self.track
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicles_mut(&mut self) -> &mut [Vehicle] {
        &mut self.vehicles
    }

    pub fn start(&self) -> Result<()> {
        for vehicle in &self.vehicles {
            vehicle
                .start()
                .with_context(|| format!("Failed to start {}", vehicle.name()))?;
        }
        Ok(())
    }

    pub fn stop(&self) {
        for vehicle in &self.vehicles {
            vehicle.stop();
        }
    }
}

fn build_vehicle(
    track: &Arc<FullTrack>,
    simulator: &SimulatorConfig,
    config: &VehicleConfig,
) -> Result<Vehicle> {
    let mut vehicle = match &config.physical {
        None => {
            let service =
                LocationService::new(Arc::clone(track), simulator.clone(), config.starting_offset_mm);
            Vehicle::new_virtual(config.name.clone(), service)
        }
        Some(car) => {
            if car.start_piece >= track.len() {
                anyhow::bail!(
                    "Vehicle {} starts on piece {} but the track has {} pieces",
                    config.name,
                    car.start_piece,
                    track.len()
                );
            }
            let direction = if car.reversed { -1 } else { 1 };
            let driver = DemoDriver::new(
                Arc::clone(track),
                simulator.clone(),
                config.starting_offset_mm,
                car.start_piece,
                direction,
            );
            let service = PhysicalLocationService::new(
                Arc::clone(track),
                simulator.clone(),
                config.starting_offset_mm,
            );
            Vehicle::new_physical(config.name.clone(), service, Box::new(driver))
        }
    };

    vehicle.set_speed_percent(config.speed_percent);
    vehicle.set_lane(config.lane);
    info!(
        vehicle = %config.name,
        physical = vehicle.is_physical(),
        speed_percent = config.speed_percent,
        lane = config.lane,
        "Vehicle ready"
    );
    Ok(vehicle)
}

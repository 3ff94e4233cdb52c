//! A named vehicle: its simulator, plus the driver for a physical car

use crate::driver::{DriverEvent, VehicleDriver};
use crate::physical::PhysicalLocationService;
use crate::simulator::LocationService;
use anyhow::Result;
use tracing::{debug, warn};
use trackdrive_core::units::{MillimetersPerSecond, SpeedPercent};

/// Which simulator backs a vehicle
pub enum Locator {
    /// Pure simulation, nothing on the real track
    Virtual(LocationService),
    /// Simulation reconciled with a physical car's telemetry
    Physical(PhysicalLocationService),
}

impl Locator {
    pub fn service(&self) -> &LocationService {
        match self {
            Locator::Virtual(service) => service,
            Locator::Physical(service) => service,
        }
    }
}

pub struct Vehicle {
    name: String,
    locator: Locator,
    driver: Option<Box<dyn VehicleDriver>>,
}

impl Vehicle {
    pub fn new_virtual(name: impl Into<String>, service: LocationService) -> Self {
        Self {
            name: name.into(),
            locator: Locator::Virtual(service),
            driver: None,
        }
    }

    pub fn new_physical(
        name: impl Into<String>,
        service: PhysicalLocationService,
        driver: Box<dyn VehicleDriver>,
    ) -> Self {
        Self {
            name: name.into(),
            locator: Locator::Physical(service),
            driver: Some(driver),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &LocationService {
        self.locator.service()
    }

    /// The fusion-enabled simulator, for physical vehicles
    pub fn physical(&self) -> Option<&PhysicalLocationService> {
        match &self.locator {
            Locator::Physical(service) => Some(service),
            Locator::Virtual(_) => None,
        }
    }

    pub fn is_physical(&self) -> bool {
        self.physical().is_some()
    }

    pub fn set_speed_percent(&mut self, percent: f64) {
        let config = self.service().config();
        let speed = SpeedPercent::new(percent).of(MillimetersPerSecond(config.max_speed_mm_s));
        let acceleration = config.acceleration_mm_s2;
        self.service().set_speed(speed.0, acceleration);
        self.command("change speed", |driver| driver.change_speed(speed.0, acceleration));
    }

    pub fn set_lane(&mut self, lane: i32) {
        let config = self.service().config();
        let offset = (f64::from(lane) * config.lane_width_mm)
            .clamp(-config.max_offset_mm, config.max_offset_mm);
        self.service().set_target_offset(offset);
        self.command("change lane", |driver| driver.change_lane(offset));
    }

    /// Returns false if a U-turn was already in progress
    pub fn uturn(&mut self) -> bool {
        let started = self.service().do_uturn();
        if started {
            self.command("turn", |driver| driver.do_turn());
        }
        started
    }

    /// Forward a command to the physical car; failures are logged, the
    /// simulation keeps the commanded state
    fn command(&mut self, what: &str, f: impl FnOnce(&mut dyn VehicleDriver) -> Result<()>) {
        let Some(driver) = self.driver.as_deref_mut() else {
            return;
        };
        if let Err(e) = f(driver) {
            warn!(vehicle = %self.name, "Driver failed to {}: {}", what, e);
        }
    }

    /// Drain the driver's telemetry into the fusion layer
    ///
    /// Returns the number of events applied.
    pub fn pump_events(&mut self) -> Result<usize> {
        let (Some(driver), Locator::Physical(service)) = (self.driver.as_deref_mut(), &self.locator)
        else {
            return Ok(0);
        };

        let events = driver.poll_events()?;
        for event in &events {
            match *event {
                DriverEvent::Location {
                    location,
                    piece_id,
                    offset_mm,
                    speed_mm_s,
                    ..
                } => {
                    let outcome =
                        service.notify_location_event(piece_id, location, offset_mm, speed_mm_s);
                    debug!(vehicle = %self.name, piece_id, ?outcome, "Location event");
                }
                DriverEvent::Transition {
                    piece_id,
                    prev_piece_id,
                    offset_mm,
                    ..
                } => {
                    let gap = service.notify_transition_event(offset_mm);
                    debug!(vehicle = %self.name, piece_id, prev_piece_id, ?gap, "Transition event");
                }
            }
        }
        Ok(events.len())
    }

    pub fn start(&self) -> crate::error::Result<()> {
        self.service().start()
    }

    pub fn stop(&self) {
        self.service().stop();
    }
}

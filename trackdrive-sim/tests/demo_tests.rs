//! Integration tests for the DemoDriver feeding a physical vehicle

use std::sync::Arc;
use trackdrive_core::FullTrack;
use trackdrive_sim::{
    DemoDriver, PhysicalLocationService, SimulatorConfig, Vehicle, VehicleDriver,
};

fn oval() -> Arc<FullTrack> {
    Arc::new(
        FullTrack::builder()
            .start(Some(34), Some(33))
            .straight(Some(36))
            .curve_right(Some(17))
            .curve_right(Some(18))
            .straight(Some(39))
            .straight(Some(40))
            .curve_right(Some(20))
            .curve_right(Some(23))
            .build()
            .unwrap(),
    )
}

fn demo_vehicle(piece_index: usize, direction: i8) -> Vehicle {
    let track = oval();
    let config = SimulatorConfig::default();
    let driver = DemoDriver::new(Arc::clone(&track), config.clone(), 0.0, piece_index, direction);
    let service = PhysicalLocationService::new(track, config, 0.0);
    Vehicle::new_physical("demo", service, Box::new(driver))
}

fn drive(vehicle: &mut Vehicle, ticks: usize) {
    for _ in 0..ticks {
        vehicle.pump_events().unwrap();
        vehicle.service().tick().unwrap();
    }
}

#[test]
fn test_demo_driver_name() {
    let driver = DemoDriver::new(oval(), SimulatorConfig::default(), 0.0, 0, 1);
    assert_eq!(driver.name(), "Demo");
}

#[test]
fn test_physical_vehicle_locks_onto_demo_car() {
    let mut vehicle = demo_vehicle(4, 1);
    vehicle.set_speed_percent(40.0);
    drive(&mut vehicle, 300);

    let fusion = vehicle.physical().unwrap().fusion_snapshot();
    let physical_index = fusion.physical_index.expect("demo car never located");
    let snap = vehicle.service().snapshot();
    assert_eq!(snap.direction, 1);

    let track = vehicle.service().track();
    let near = [
        physical_index,
        track.index_step(physical_index, 1),
        track.index_step(physical_index, -1),
    ];
    assert!(
        near.contains(&snap.piece_index),
        "simulated piece {} far from physical piece {}",
        snap.piece_index,
        physical_index
    );
}

#[test]
fn test_physical_vehicle_follows_reversed_demo_car() {
    let mut vehicle = demo_vehicle(6, -1);
    vehicle.set_speed_percent(40.0);
    drive(&mut vehicle, 300);

    let snap = vehicle.service().snapshot();
    assert_eq!(snap.direction, -1, "simulation did not turn around");
    assert!(vehicle
        .physical()
        .unwrap()
        .fusion_snapshot()
        .physical_index
        .is_some());
    assert!(!snap.uturn_in_progress);
}

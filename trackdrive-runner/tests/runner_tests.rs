//! Integration tests for fleet assembly and the manager loop

use trackdrive_runner::config::{PhysicalCarConfig, RunnerConfig, VehicleConfig};
use trackdrive_runner::fleet::Fleet;
use trackdrive_runner::manager;

fn short_demo(run_for_secs: f64) -> RunnerConfig {
    let mut config = RunnerConfig::demo().unwrap();
    config.run_for_secs = Some(run_for_secs);
    config.summary_interval_secs = 0.1;
    config
}

#[test]
fn test_fleet_from_demo_config() {
    let fleet = Fleet::from_config(&RunnerConfig::demo().unwrap()).unwrap();
    assert_eq!(fleet.track().len(), 9);
    assert!(fleet.track().is_geometrically_closed());

    let vehicles = fleet.vehicles();
    assert_eq!(vehicles.len(), 2);
    assert!(!vehicles[0].is_physical());
    assert!(vehicles[1].is_physical());

    // Initial commands already applied
    let ghost = vehicles[0].service().snapshot();
    assert_eq!(ghost.target_speed, 600.0);
    assert_eq!(ghost.target_offset, -23.0);
    assert!(!vehicles[0].service().is_running());
}

#[test]
fn test_physical_start_piece_must_be_on_track() {
    let mut config = RunnerConfig::demo().unwrap();
    config.vehicles = vec![VehicleConfig {
        name: "lost".to_string(),
        physical: Some(PhysicalCarConfig {
            start_piece: 42,
            reversed: false,
        }),
        starting_offset_mm: 0.0,
        speed_percent: 30.0,
        lane: 0,
    }];
    let err = Fleet::from_config(&config).err().expect("should reject piece 42");
    assert!(err.to_string().contains("piece 42"), "{}", err);
}

#[test]
fn test_empty_track_is_rejected() {
    let mut config = RunnerConfig::demo().unwrap();
    config.track.clear();
    assert!(Fleet::from_config(&config).is_err());
}

#[tokio::test]
async fn test_manager_runs_and_stops_fleet() {
    let config = short_demo(0.5);
    let mut fleet = Fleet::from_config(&config).unwrap();
    manager::run(&mut fleet, &config).await.unwrap();

    for vehicle in fleet.vehicles() {
        assert!(!vehicle.service().is_running(), "{} still running", vehicle.name());
        assert!(vehicle.service().snapshot().tick > 0, "{} never ticked", vehicle.name());
    }
    let demo = fleet.vehicles()[1].physical().unwrap();
    assert!(!demo.fusion_snapshot().history.is_empty(), "no telemetry reached the fusion layer");
}

#[tokio::test]
async fn test_manager_rejects_invalid_tick_rate() {
    let mut config = short_demo(0.1);
    config.simulator.ticks_per_second = 0.0;
    let mut fleet = Fleet::from_config(&config).unwrap();
    assert!(manager::run(&mut fleet, &config).await.is_err());
}

#[test]
fn test_shipped_config_matches_demo() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/demo.json");
    let config = RunnerConfig::load(&path).unwrap();
    let demo = RunnerConfig::demo().unwrap();
    assert_eq!(config.track, demo.track);
    assert_eq!(config.vehicles, demo.vehicles);
    assert_eq!(config.simulator, demo.simulator);
}

//! Integration tests for physical telemetry fusion

use std::sync::Arc;
use trackdrive_core::FullTrack;
use trackdrive_sim::{
    LocationOutcome, PhysicalLocationService, Resolution, SimulatorConfig,
};

/// Clockwise oval, every piece carrying a distinct physical id
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

fn physical(track: Arc<FullTrack>) -> PhysicalLocationService {
    PhysicalLocationService::new(track, SimulatorConfig::default(), 0.0)
}

fn resolution(outcome: LocationOutcome) -> Resolution {
    match outcome {
        LocationOutcome::Recorded { resolution, .. } => resolution,
        other => panic!("expected a recorded location, got {:?}", other),
    }
}

#[test]
fn test_two_reads_resolve_forward_travel() {
    let sim = physical(oval());
    let first = sim.notify_location_event(34, 1, 0.0, 400.0);
    assert_eq!(resolution(first), Resolution::Ambiguous { candidates: 2 });

    assert_eq!(sim.notify_transition_event(0.0), None);
    let second = sim.notify_location_event(33, 2, 0.0, 400.0);
    assert_eq!(
        resolution(second),
        Resolution::Resolved {
            piece_index: 1,
            reversed: false
        }
    );

    let snap = sim.snapshot();
    assert_eq!(snap.piece_index, 1);
    assert_eq!(snap.progress, 0.0);
    assert_eq!(snap.direction, 1);
    assert_eq!(sim.fusion_snapshot().physical_index, Some(1));
}

#[test]
fn test_reversed_reads_turn_the_simulation_around() {
    let sim = physical(oval());
    sim.notify_location_event(36, 1, 23.0, 400.0);
    sim.notify_transition_event(23.0);
    let outcome = sim.notify_location_event(33, 2, 23.0, 400.0);
    assert_eq!(
        resolution(outcome),
        Resolution::Resolved {
            piece_index: 1,
            reversed: true
        }
    );

    let snap = sim.snapshot();
    assert_eq!(snap.direction, -1);
    assert_eq!(snap.piece_index, 1);
    assert_eq!(snap.progress, sim.track().piece(1).length(snap.actual_offset));
    // Still 23mm right of the car's own direction
    assert_eq!(snap.target_offset, -23.0);
    assert_eq!(sim.speed_correction(), 0.0);

    // History is now in track order: the cursor follows the car backward
    let fusion = sim.fusion_snapshot();
    assert_eq!(fusion.history.cursor(), 1);
    assert_eq!(fusion.history.slots()[2], Some(36));
}

#[test]
fn test_symmetric_track_stays_ambiguous() {
    let track = Arc::new(
        FullTrack::builder()
            .straight(Some(10))
            .straight(Some(11))
            .straight(Some(10))
            .straight(Some(11))
            .build()
            .unwrap(),
    );
    let sim = physical(track);
    for (i, id) in [10, 11, 10, 11, 10, 11].into_iter().enumerate() {
        if i > 0 {
            sim.notify_transition_event(0.0);
        }
        let outcome = sim.notify_location_event(id, i as u8, 0.0, 300.0);
        assert!(
            matches!(resolution(outcome), Resolution::Ambiguous { .. }),
            "resolved a symmetric track after {} reads",
            i + 1
        );
    }
    assert_eq!(sim.fusion_snapshot().physical_index, None);
}

#[test]
fn test_contradicting_read_resets_history() {
    let sim = physical(oval());
    sim.notify_location_event(34, 1, 0.0, 300.0);
    let outcome = sim.notify_location_event(36, 2, 0.0, 300.0);
    assert!(matches!(outcome, LocationOutcome::Recorded { reset: true, .. }));

    let history = sim.fusion_snapshot().history;
    assert_eq!(history.slots()[0], Some(36));
    assert_eq!(history.slots().iter().flatten().count(), 1);
}

#[test]
fn test_impossible_sequence_clears_history() {
    let sim = physical(oval());
    sim.notify_location_event(34, 1, 0.0, 300.0);
    sim.notify_transition_event(0.0);
    let outcome = sim.notify_location_event(18, 2, 0.0, 300.0);
    assert_eq!(resolution(outcome), Resolution::NoMatch);
    assert!(sim.fusion_snapshot().history.is_empty());
}

#[test]
fn test_relocated_car_is_adopted_after_no_match() {
    let sim = physical(oval());
    sim.notify_location_event(34, 1, 0.0, 500.0);
    sim.notify_transition_event(0.0);
    sim.notify_location_event(33, 2, 0.0, 500.0);
    sim.notify_transition_event(0.0).unwrap();
    assert!(sim.speed_correction() > 0.0);

    // Picked up and put down on piece 6: its id fits no alignment
    let outcome = sim.notify_location_event(40, 3, 0.0, 500.0);
    assert_eq!(resolution(outcome), Resolution::NoMatch);
    let fusion = sim.fusion_snapshot();
    assert_eq!(fusion.physical_index, None);
    assert_eq!(fusion.correction, 0.0);

    assert_eq!(sim.notify_transition_event(0.0), None, "gap fed while lost");
    sim.notify_location_event(20, 4, 0.0, 500.0);
    assert_eq!(sim.notify_transition_event(0.0), None, "gap fed while lost");
    assert_eq!(sim.speed_correction(), 0.0);

    let outcome = sim.notify_location_event(23, 5, 0.0, 500.0);
    assert_eq!(
        resolution(outcome),
        Resolution::Resolved {
            piece_index: 8,
            reversed: false
        }
    );
    let snap = sim.snapshot();
    assert_eq!(snap.piece_index, 8, "simulation not moved to the relocated car");
    assert_eq!(snap.progress, 0.0);
    assert_eq!(snap.direction, 1);
    assert_eq!(sim.fusion_snapshot().physical_index, Some(8));
}

#[test]
fn test_location_offset_beyond_road_is_clamped() {
    let sim = physical(oval());
    let max = sim.config().max_offset_mm;
    sim.notify_location_event(34, 1, 500.0, 300.0);
    assert_eq!(sim.snapshot().target_offset, max);
    sim.notify_location_event(34, 2, -500.0, 300.0);
    assert_eq!(sim.snapshot().target_offset, -max);
}

#[test]
fn test_unknown_piece_is_ignored() {
    let sim = physical(oval());
    let before = sim.snapshot();
    assert_eq!(
        sim.notify_location_event(99, 1, 10.0, 300.0),
        LocationOutcome::UnknownPiece(99)
    );
    assert_eq!(sim.snapshot(), before);
}

#[test]
fn test_falling_behind_raises_effective_speed() {
    let sim = physical(oval());
    sim.notify_location_event(34, 1, 0.0, 500.0);
    sim.notify_transition_event(0.0);
    sim.notify_location_event(33, 2, 0.0, 500.0);

    // The car reaches piece 2 while the simulation is still at the start of piece 1
    let gap = sim.notify_transition_event(0.0).unwrap();
    assert!((gap - 220.0).abs() < 1e-9, "gap {}", gap);
    let correction = sim.speed_correction();
    assert!((correction - 0.3 * 220.0).abs() < 1e-9);

    sim.set_speed(500.0, 1e6);
    sim.tick().unwrap();
    assert!((sim.snapshot().actual_speed - (500.0 + correction)).abs() < 1e-9);
}

#[test]
fn test_falling_behind_while_reversed_raises_effective_speed() {
    let sim = physical(oval());
    sim.notify_location_event(36, 1, 23.0, 500.0);
    sim.notify_transition_event(23.0);
    sim.notify_location_event(33, 2, 23.0, 500.0);
    assert_eq!(sim.snapshot().direction, -1);
    assert_eq!(sim.speed_correction(), 0.0);

    // The car backs into piece 0 while the simulation sits at the far end of piece 1
    let gap = sim.notify_transition_event(23.0).unwrap();
    let expected = sim.track().piece(1).length(-23.0);
    assert!((gap - expected).abs() < 1e-9, "gap {} expected {}", gap, expected);
    let correction = sim.speed_correction();
    assert!(correction > 0.0, "correction {} should speed the simulation up", correction);
    assert!((correction - 0.3 * expected).abs() < 1e-9);
    assert_eq!(sim.fusion_snapshot().physical_index, Some(0));

    sim.set_speed(500.0, 1e6);
    sim.tick().unwrap();
    assert!((sim.snapshot().actual_speed - (500.0 + correction)).abs() < 1e-9);
}

#[test]
fn test_no_correction_below_low_speed_threshold() {
    let sim = physical(oval());
    sim.notify_location_event(34, 1, 0.0, 500.0);
    sim.notify_transition_event(0.0);
    sim.notify_location_event(33, 2, 0.0, 500.0);
    sim.notify_transition_event(0.0);
    assert!(sim.speed_correction() > 0.0);

    sim.set_speed(50.0, 1e6);
    sim.tick().unwrap();
    assert_eq!(sim.snapshot().actual_speed, 50.0);
}

#[test]
fn test_find_physical_location_reruns_resolution() {
    let sim = physical(oval());
    assert_eq!(
        sim.find_physical_location(),
        Resolution::Ambiguous { candidates: 18 }
    );
}

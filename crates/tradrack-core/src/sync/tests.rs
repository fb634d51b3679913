use super::*;
use crate::test_helpers::{test_config, HostCall, SimHost};
use tradrack_types::{KinematicSolver, ValidationError};

fn setup() -> (ExtruderSyncManager, SimHost, EventLog) {
    (ExtruderSyncManager::new(), SimHost::new(&test_config()), EventLog::new())
}

#[test]
fn test_extruder_sync_rebinds_extruder() {
    let (mut sync, mut host, mut events) = setup();

    sync.sync_extruder_to_driver(&mut host, &mut events);

    assert_eq!(sync.state(), SyncState::ExtruderDrivesDriver);
    assert!(sync.is_extruder_synced());
    assert_eq!(host.bindings[&StepperId::Extruder], StepperBinding::rack_filament());
    assert_eq!(host.generators[&MotionSource::Rack], vec![StepperId::FilamentDriver, StepperId::Extruder]);
    assert!(host.generators[&MotionSource::Machine].is_empty());
    assert!(events.pending().is_empty());
}

#[test]
fn test_flush_precedes_rebind() {
    let (mut sync, mut host, mut events) = setup();

    sync.sync_extruder_to_driver(&mut host, &mut events);

    let rebind = host
        .index_of(&HostCall::Rebind(StepperId::Extruder, StepperBinding::rack_filament()))
        .unwrap();
    let flush_machine = host.index_of(&HostCall::Flush(MotionSource::Machine)).unwrap();
    let flush_rack = host.index_of(&HostCall::Flush(MotionSource::Rack)).unwrap();
    assert!(flush_machine < rebind);
    assert!(flush_rack < rebind);
}

#[test]
fn test_unsync_restores_binding() {
    let (mut sync, mut host, mut events) = setup();
    let before_bindings = host.bindings.clone();
    let before_dpr = host.dpr.clone();

    sync.sync_extruder_to_driver(&mut host, &mut events);
    sync.unsync(&mut host, &mut events);

    assert_eq!(sync.state(), SyncState::Unsynced);
    assert_eq!(host.bindings, before_bindings);
    assert_eq!(host.dpr, before_dpr);
    assert_eq!(host.generators[&MotionSource::Machine], vec![StepperId::Extruder]);
    assert_eq!(host.generators[&MotionSource::Rack], vec![StepperId::FilamentDriver]);
}

#[test]
fn test_driver_sync_emits_events() {
    let (mut sync, mut host, mut events) = setup();

    sync.sync_driver_to_extruder(&mut host, &mut events);
    assert_eq!(
        host.bindings[&StepperId::FilamentDriver].solver,
        KinematicSolver::Extruder
    );
    sync.unsync(&mut host, &mut events);

    assert_eq!(
        events.drain(),
        vec![RackEvent::SyncedToExtruder, RackEvent::UnsyncingFromExtruder]
    );
}

#[test]
fn test_cross_transition_goes_through_unsynced() {
    let (mut direct, mut host_a, mut events_a) = setup();
    direct.sync_extruder_to_driver(&mut host_a, &mut events_a);
    let mark_a = host_a.calls.len();
    direct.sync_driver_to_extruder(&mut host_a, &mut events_a);

    let (mut explicit, mut host_b, mut events_b) = setup();
    explicit.sync_extruder_to_driver(&mut host_b, &mut events_b);
    let mark_b = host_b.calls.len();
    explicit.unsync(&mut host_b, &mut events_b);
    explicit.sync_driver_to_extruder(&mut host_b, &mut events_b);

    assert_eq!(direct.state(), explicit.state());
    assert_eq!(host_a.calls[mark_a..], host_b.calls[mark_b..]);
    assert_eq!(host_a.bindings, host_b.bindings);
    assert_eq!(host_a.generators, host_b.generators);
    assert_eq!(host_a.bindings[&StepperId::Extruder], StepperId::Extruder.home_binding());
    assert_eq!(events_a.drain(), events_b.drain());
}

#[test]
fn test_sync_is_idempotent() {
    let (mut sync, mut host, mut events) = setup();
    sync.sync_driver_to_extruder(&mut host, &mut events);
    let calls = host.calls.len();

    sync.sync_driver_to_extruder(&mut host, &mut events);

    assert_eq!(host.calls.len(), calls);
    assert_eq!(events.drain(), vec![RackEvent::SyncedToExtruder]);
}

#[test]
fn test_multiplier_requires_driver_sync() {
    let (mut sync, mut host, mut events) = setup();
    assert_eq!(
        sync.set_driver_multiplier(&mut host, 1.05),
        Err(ValidationError::DriverNotSynced)
    );

    sync.sync_extruder_to_driver(&mut host, &mut events);
    assert_eq!(
        sync.set_driver_multiplier(&mut host, 1.05),
        Err(ValidationError::DriverNotSynced)
    );
}

#[test]
fn test_multiplier_scales_from_baseline() {
    let (mut sync, mut host, mut events) = setup();
    let baseline = host.dpr[&StepperId::FilamentDriver];
    sync.sync_driver_to_extruder(&mut host, &mut events);

    sync.set_driver_multiplier(&mut host, 1.05).unwrap();
    sync.set_driver_multiplier(&mut host, 0.95).unwrap();
    assert!((host.dpr[&StepperId::FilamentDriver] - baseline / 0.95).abs() < 1e-12);

    sync.unsync(&mut host, &mut events);
    assert_eq!(host.dpr[&StepperId::FilamentDriver], baseline);
}

#[test]
fn test_multiplier_rejects_non_positive() {
    let (mut sync, mut host, mut events) = setup();
    sync.sync_driver_to_extruder(&mut host, &mut events);
    assert!(matches!(
        sync.set_driver_multiplier(&mut host, 0.0),
        Err(ValidationError::InvalidMultiplier { .. })
    ));
}

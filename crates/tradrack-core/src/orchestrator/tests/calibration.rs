use std::rc::Rc;

use serde_json::json;
use tradrack_types::{
    Axis, BowdenDirection, BowdenLengthStats, CalibrationStage, LoadRequest, RackError,
    ResumeAction, SelectorCalibration, ValidationError,
};

use super::{assert_close, engine, engine_with, engine_with_store, Engine};
use crate::orchestrator::ToolChangeOrchestrator;
use crate::lanes::LanePositionTable;
use crate::storage::{keys, load_as, save_as, MemoryStore, VariableStore};
use crate::test_helpers::{test_config, FlakyStore, HostCall, SimHost, SimProcess};

/// Rack whose lanes really sit 17.3mm apart, 40mm from the endstop.
fn miscalibrated_rack() -> Engine {
    let mut engine = engine();
    let host = engine.host_mut();
    host.endstop_physical = -40.0;
    host.lane_positions = vec![0.0, 17.3, 34.6, 51.9];
    engine
}

#[test]
fn test_selector_calibration_measures_lanes() {
    let mut engine = miscalibrated_rack();

    engine.begin_selector_calibration().unwrap();
    assert_eq!(
        engine.resume_stack().peek(),
        Some(&ResumeAction::CalibrateSelector { stage: CalibrationStage::FirstLane, first_lane_distance: None })
    );
    assert!(!engine.host().homed.contains(&Axis::Selector));
    assert!(engine.process().paused);

    engine.host_mut().align_selector(0);
    engine.resume().unwrap();
    let Some(ResumeAction::CalibrateSelector { stage, first_lane_distance }) = engine.resume_stack().peek() else {
        panic!("expected the last lane stage");
    };
    assert_eq!(*stage, CalibrationStage::LastLane);
    assert_close(first_lane_distance.unwrap(), 40.0);
    assert!(engine.process().paused);

    engine.host_mut().align_selector(3);
    engine.resume().unwrap();

    assert!(engine.resume_stack().is_empty());
    assert!(!engine.process().paused);
    for (actual, expected) in engine.lane_positions().iter().zip([0.0, 17.3, 34.6, 51.9]) {
        assert_close(*actual, expected);
    }
    let saved: SelectorCalibration = load_as(engine.store(), keys::CALIB_SELECTOR).unwrap();
    assert_close(saved.spacing, 17.3);
    assert_close(saved.position_endstop, -40.0);

    engine.go_to_lane(2).unwrap();
    assert_eq!(engine.host().engaged_lane(), Some(2));
}

#[test]
fn test_selector_calibration_rejects_missing_endstop() {
    let mut engine = miscalibrated_rack();
    engine.host_mut().endstop_physical = -500.0;
    engine.begin_selector_calibration().unwrap();
    engine.host_mut().align_selector(0);

    let err = engine.resume().unwrap_err();

    assert!(matches!(err, RackError::Validation(ValidationError::CalibrationRejected { .. })));
    assert_eq!(
        engine.resume_stack().peek(),
        Some(&ResumeAction::CalibrateSelector { stage: CalibrationStage::FirstLane, first_lane_distance: None })
    );
}

#[test]
fn test_saved_selector_calibration_applied_at_startup() {
    let config = test_config();
    let calibration = LanePositionTable::from_config(&config).calibrate(40.0, 91.9).unwrap();
    let mut store = MemoryStore::new();
    save_as(&mut store, keys::CALIB_SELECTOR, &calibration).unwrap();

    let engine = engine_with_store(config, store);

    assert_eq!(engine.lane_positions(), calibration.lane_positions.as_slice());
    assert!(engine.host().calls.contains(&HostCall::SetEndstop(Axis::Selector, -40.0)));
}

#[test]
fn test_saved_calibration_for_other_layout_ignored() {
    let mut config = test_config();
    let calibration = LanePositionTable::from_config(&config).calibrate(40.0, 91.9).unwrap();
    let mut store = MemoryStore::new();
    save_as(&mut store, keys::CALIB_SELECTOR, &calibration).unwrap();
    config.lane_spacing = 20.0;

    let engine = engine_with_store(config, store);

    assert_close(engine.lane_positions()[1], 20.0);
    assert!(engine.host().calls.is_empty());
}

#[test]
fn test_bowden_stats_restored_when_length_unchanged() {
    let mut store = MemoryStore::new();
    store.save_variable(keys::CONFIG_BOWDEN_LENGTH, json!(1000.0)).unwrap();
    let stats = BowdenLengthStats { new_set_length: 950.0, sample_count: 3 };
    save_as(&mut store, keys::CALIB_BOWDEN_LOAD_LENGTH, &stats).unwrap();

    let engine = engine_with_store(test_config(), store);

    assert_close(engine.bowden_load().length(), 950.0);
    assert_eq!(engine.bowden_load().sample_count(), 3);
    assert_close(engine.bowden_unload().length(), 1000.0);
}

#[test]
fn test_bowden_stats_dropped_when_length_changed() {
    let mut store = MemoryStore::new();
    store.save_variable(keys::CONFIG_BOWDEN_LENGTH, json!(900.0)).unwrap();
    let stats = BowdenLengthStats { new_set_length: 950.0, sample_count: 3 };
    save_as(&mut store, keys::CALIB_BOWDEN_LOAD_LENGTH, &stats).unwrap();

    let engine = engine_with_store(test_config(), store);

    assert_close(engine.bowden_load().length(), 1000.0);
    assert_eq!(engine.bowden_load().sample_count(), 0);
    assert_eq!(engine.store().get_variable(keys::CONFIG_BOWDEN_LENGTH), Some(json!(1000.0)));
}

#[test]
fn test_discard_bowden_lengths() {
    let mut engine = engine();
    engine.load_toolhead(LoadRequest::lane(0)).unwrap();
    engine.unload_toolhead().unwrap();

    engine.discard_bowden_lengths(BowdenDirection::Load).unwrap();

    assert_close(engine.bowden_load().length(), 1000.0);
    assert!(!engine.bowden_load().is_calibrated());
    assert_eq!(engine.store().get_variable(keys::CALIB_BOWDEN_LOAD_LENGTH), Some(json!(null)));
    assert_eq!(engine.bowden_unload().sample_count(), 1);
}

#[test]
fn test_bowden_history_written() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.bowden_log_dir = Some(dir.path().to_string_lossy().into_owned());
    let mut engine = engine_with(config);

    engine.load_toolhead(LoadRequest::lane(0)).unwrap();
    engine.unload_toolhead().unwrap();

    let load_log = std::fs::read_to_string(dir.path().join("bowden_load_lengths.csv")).unwrap();
    let unload_log = std::fs::read_to_string(dir.path().join("bowden_unload_lengths.csv")).unwrap();
    assert_eq!(load_log.lines().count(), 2);
    assert_eq!(unload_log.lines().count(), 2);
}

#[test]
fn test_discarded_lengths_stay_discarded_after_restart() {
    let mut engine = engine();
    engine.load_toolhead(LoadRequest::lane(0)).unwrap();
    engine.unload_toolhead().unwrap();
    engine.discard_bowden_lengths(BowdenDirection::Load).unwrap();

    let restarted = engine_with_store(test_config(), engine.store().clone());

    assert_eq!(restarted.bowden_load().sample_count(), 0);
    assert_close(restarted.bowden_load().length(), 1000.0);
    assert_eq!(restarted.bowden_unload().sample_count(), 1);
}

#[test]
fn test_persistence_failure_keeps_learned_length() {
    let config = test_config();
    let host = SimHost::new(&config);
    let store = FlakyStore::default();
    let failing = Rc::clone(&store.failing);
    let mut engine = ToolChangeOrchestrator::new(config, host, store, SimProcess::printing()).unwrap();
    failing.set(true);

    let err = engine.load_toolhead(LoadRequest::lane(0)).unwrap_err();

    assert!(matches!(err, RackError::Persistence { .. }));
    // The load itself finished and the sample is kept in memory
    assert_eq!(engine.active_lane(), Some(0));
    assert_eq!(engine.bowden_load().sample_count(), 1);
    assert_close(engine.bowden_load().length(), 976.0);
    assert!(engine.resume_stack().is_empty());
    assert!(!engine.process().paused);
    assert_eq!(engine.store().get_variable(keys::CALIB_BOWDEN_LOAD_LENGTH), None);
}

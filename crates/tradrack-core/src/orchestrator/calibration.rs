//! Learned lengths, selector calibration and saved-state persistence.

use tracing::{info, warn};
use tradrack_types::{
    Axis, BowdenDirection, BowdenLengthStats, CalibrationStage, RackError, ResumeAction,
    SelectorCalibration, Sensor, ValidationError,
};

use super::ToolChangeOrchestrator;
use crate::error::StoreResult;
use crate::host::{MotionHost, ProcessControl};
use crate::storage::{keys, load_as, save_as, VariableStore};

impl<H: MotionHost, S: VariableStore, P: ProcessControl> ToolChangeOrchestrator<H, S, P> {
    /// Forget learned bowden lengths and their saved stats.
    pub fn discard_bowden_lengths(&mut self, which: BowdenDirection) -> Result<(), RackError> {
        if which.includes_load() {
            self.bowden_load.discard();
            save_as(&mut self.store, keys::CALIB_BOWDEN_LOAD_LENGTH, &serde_json::Value::Null)?;
        }
        if which.includes_unload() {
            self.bowden_unload.discard();
            save_as(&mut self.store, keys::CALIB_BOWDEN_UNLOAD_LENGTH, &serde_json::Value::Null)?;
        }
        info!(?which, "Discarded bowden length samples");
        Ok(())
    }

    /// Start measuring lane positions by hand.
    ///
    /// Homes the selector, releases its motor and waits for the user to move
    /// it onto the first lane and resume.
    pub fn begin_selector_calibration(&mut self) -> Result<(), RackError> {
        self.ensure_idle()?;
        self.home_selector_inner()?;
        self.host.disable_motor(Axis::Selector);
        self.resume.push(ResumeAction::CalibrateSelector {
            stage: CalibrationStage::FirstLane,
            first_lane_distance: None,
        });
        info!("Move the selector over lane 0 by hand, then resume");
        self.process.pause();
        Ok(())
    }

    /// Measure the current reference lane and advance the calibration.
    pub(super) fn calibrate_selector_stage(
        &mut self,
        stage: CalibrationStage,
        first_lane_distance: Option<f64>,
    ) -> Result<(), RackError> {
        let distance = self.measure_endstop_distance()?;
        match stage {
            CalibrationStage::FirstLane => {
                self.host.disable_motor(Axis::Selector);
                self.resume.push(ResumeAction::CalibrateSelector {
                    stage: CalibrationStage::LastLane,
                    first_lane_distance: Some(distance),
                });
                info!(
                    distance,
                    lane = self.config.lane_count - 1,
                    "First lane measured; move the selector over the last lane, then resume"
                );
            },
            CalibrationStage::LastLane => {
                let first = first_lane_distance.ok_or_else(|| ValidationError::CalibrationRejected {
                    message: "first lane was never measured".to_string(),
                })?;
                let calibration = self.positions.calibrate(first, distance)?;
                self.apply_selector_calibration(&calibration);
                save_as(&mut self.store, keys::CALIB_SELECTOR, &calibration)?;
                self.home_selector_inner()?;
                info!(
                    spacing = calibration.spacing,
                    position_endstop = calibration.position_endstop,
                    "Selector calibrated"
                );
            },
        }
        Ok(())
    }

    /// Distance from the selector's current spot to its endstop.
    fn measure_endstop_distance(&mut self) -> Result<f64, RackError> {
        let pos = self.host.get_position().with_selector(0.0);
        self.host.set_position(pos, &[Axis::Selector]);
        self.host.enable_motor(Axis::Selector);

        let travel = self.config.selector_calibration_travel();
        let request = tradrack_types::HomingRequest::new(
            Sensor::SelectorEndstop,
            pos.with_selector(-travel),
            self.config.selector_sense_speed,
        )
        .probing();
        match self.host.home_until_sensor(&request) {
            Ok(trigger) => Ok(-trigger.selector),
            Err(e) if e.is_no_trigger() => Err(ValidationError::CalibrationRejected {
                message: format!("selector endstop not reached within {travel:.1}mm"),
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    fn apply_selector_calibration(&mut self, calibration: &SelectorCalibration) {
        self.positions.apply(calibration);
        for (lane, position) in self.lanes.iter_mut().zip(self.positions.positions()) {
            lane.position = *position;
        }
        self.host.set_endstop_position(Axis::Selector, calibration.position_endstop);
    }

    pub(super) fn record_bowden_load(&mut self, length: f64, reached_early: bool) {
        let sample = self.bowden_load.record_sample(length, reached_early);
        info!(
            length,
            set_length = sample.new_set_length,
            samples = sample.sample_count,
            "Bowden load length sample"
        );
        let stats = sample.stats();
        let result = save_as(&mut self.store, keys::CALIB_BOWDEN_LOAD_LENGTH, &stats)
            .and_then(|()| self.history.as_ref().map_or(Ok(()), |h| h.record_load(&sample)));
        self.stash_persist_result(result);
    }

    pub(super) fn record_bowden_unload(&mut self, length: f64, reached_early: bool) {
        let sample = self.bowden_unload.record_sample(length, reached_early);
        info!(
            length,
            set_length = sample.new_set_length,
            samples = sample.sample_count,
            "Bowden unload length sample"
        );
        let stats = sample.stats();
        let result = save_as(&mut self.store, keys::CALIB_BOWDEN_UNLOAD_LENGTH, &stats)
            .and_then(|()| self.history.as_ref().map_or(Ok(()), |h| h.record_unload(&sample)));
        self.stash_persist_result(result);
    }

    pub(super) fn persist_active_lane(&mut self) {
        if !self.config.save_active_lane {
            return;
        }
        let result = save_as(&mut self.store, keys::ACTIVE_LANE, &self.active_lane);
        self.stash_persist_result(result);
    }

    pub(super) fn persist_heater_target(&mut self, temperature: f64) {
        self.last_heater_target = Some(temperature);
        let result = save_as(&mut self.store, keys::LAST_HEATER_TARGET, &temperature);
        self.stash_persist_result(result);
    }

    fn stash_persist_result(&mut self, result: StoreResult<()>) {
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist rack state");
            self.persist_error.get_or_insert(e.into());
        }
    }

    /// Load learned lengths, calibration and the active lane from the store.
    pub(super) fn restore_saved_state(&mut self) -> Result<(), RackError> {
        let saved_bowden: Option<f64> = load_as(&self.store, keys::CONFIG_BOWDEN_LENGTH);
        if saved_bowden.is_some_and(|saved| (saved - self.config.bowden_length).abs() < f64::EPSILON) {
            // Discarded lengths are saved as null
            let load = load_as::<Option<BowdenLengthStats>>(&self.store, keys::CALIB_BOWDEN_LOAD_LENGTH);
            if let Some(stats) = load.flatten() {
                self.bowden_load.restore(&stats);
            }
            let unload = load_as::<Option<BowdenLengthStats>>(&self.store, keys::CALIB_BOWDEN_UNLOAD_LENGTH);
            if let Some(stats) = unload.flatten() {
                self.bowden_unload.restore(&stats);
            }
        } else {
            if saved_bowden.is_some() {
                info!(
                    bowden_length = self.config.bowden_length,
                    "Configured bowden length changed, ignoring learned lengths"
                );
            }
            save_as(&mut self.store, keys::CONFIG_BOWDEN_LENGTH, &self.config.bowden_length)?;
        }

        if let Some(calibration) = load_as::<SelectorCalibration>(&self.store, keys::CALIB_SELECTOR) {
            if self.positions.accepts(&calibration) {
                self.apply_selector_calibration(&calibration);
            } else {
                warn!("Saved selector calibration does not match the lane layout, ignoring it");
            }
        }

        if self.config.save_active_lane {
            self.active_lane = load_as::<Option<usize>>(&self.store, keys::ACTIVE_LANE)
                .flatten()
                .filter(|lane| *lane < self.config.lane_count);
        }
        self.last_heater_target = load_as(&self.store, keys::LAST_HEATER_TARGET);
        Ok(())
    }
}

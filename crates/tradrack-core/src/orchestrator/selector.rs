//! Selector-level filament handling and active lane bookkeeping.

use tracing::{info, warn};
use tradrack_types::{
    Axis, LoadPhase, RackError, RackEvent, ResumeAction, Sensor, ValidationError,
};

use super::ToolChangeOrchestrator;
use crate::host::{MotionHost, ProcessControl};
use crate::storage::VariableStore;

/// Result of checking selector state against the filament sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Located {
    /// State is consistent
    Resolved,
    /// A person has to clear the selector first
    NeedsUser,
}

impl<H: MotionHost, S: VariableStore, P: ProcessControl> ToolChangeOrchestrator<H, S, P> {
    /// Feed a lane into the selector and park it behind the sensor.
    ///
    /// `reset_speed` clears the lane's unloaded flag so the next load pulls
    /// at spool speed.
    pub fn load_lane(&mut self, lane: usize, reset_speed: bool) -> Result<(), RackError> {
        self.ensure_idle()?;
        self.load_lane_inner(lane, reset_speed)
            .map_err(|e| self.interrupt(ResumeAction::ReloadLane { lane }, e))
    }

    /// Declare that `lane` is loaded into the toolhead.
    ///
    /// Used when filament was loaded by hand or the selector lost its
    /// position. Requires filament at the selector.
    pub fn set_active_lane(&mut self, lane: usize) -> Result<(), RackError> {
        self.check_lane(lane)?;
        if !self.selector_has_filament() {
            return Err(ValidationError::SelectorEmpty { action: "set the active lane".to_string() }.into());
        }
        self.set_active_lane_inner(lane);
        Ok(())
    }

    /// Forget the active lane.
    pub fn reset_active_lane(&mut self) {
        self.active_lane = None;
        self.runout.disarm();
        self.persist_active_lane();
        self.events.emit(RackEvent::ActiveLaneReset);
        info!("Active lane reset");
    }

    /// Reconcile selector position and active lane with the sensor.
    ///
    /// Pauses and waits for a resume when the selector holds filament that
    /// cannot be attributed to a lane.
    pub fn locate_selector(&mut self) -> Result<(), RackError> {
        self.ensure_idle()?;
        match self.locate_selector_inner() {
            Ok(Located::Resolved) => Ok(()),
            Ok(Located::NeedsUser) => {
                self.resume.push(ResumeAction::LocateSelector);
                warn!("Selector holds filament of an unknown lane; remove it or set the active lane, then resume");
                self.process.pause();
                Ok(())
            },
            Err(e) => Err(self.interrupt(ResumeAction::LocateSelector, e)),
        }
    }

    pub(super) fn load_lane_inner(&mut self, lane: usize, reset_speed: bool) -> Result<(), RackError> {
        self.check_lane(lane)?;
        if reset_speed {
            self.lanes[lane].unloaded = false;
        }
        info!(lane, "Loading lane");
        self.load_selector(lane)?;

        self.reset_filament_position()?;
        self.move_filament(-self.config.selector_unload_length, self.config.selector_unload_speed)?;
        self.reset_filament_position()?;
        self.raise_servo()?;
        self.lanes[lane].dead = false;
        Ok(())
    }

    /// Move to `lane`, lower the servo and feed until the selector sensor
    /// triggers.
    pub(super) fn load_selector(&mut self, lane: usize) -> Result<(), RackError> {
        self.go_to_lane_inner(lane)?;
        self.lower_servo_inner(false)?;
        self.reset_filament_position()?;

        let sense_travel = self.config.sense_travel;
        match self.home_filament(Sensor::SelectorFilament, sense_travel, self.config.selector_sense_speed, true) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => {
                self.raise_servo_quietly();
                Err(RackError::load_failed(
                    Some(lane),
                    LoadPhase::LoadSelector,
                    "No trigger on selector sensor after full movement",
                ))
            },
            Err(e) => {
                self.raise_servo_quietly();
                Err(e)
            },
        }
    }

    /// Pull filament back out of the selector and park it.
    ///
    /// `base_length` is the bowden distance already retracted; when present
    /// the measured total becomes a bowden unload sample.
    pub(super) fn unload_selector(&mut self, base_length: Option<f64>, reached_early: bool) -> Result<(), RackError> {
        if self.selector_has_filament() {
            self.lower_servo_inner(false)?;
            self.reset_filament_position()?;
            let move_start = self.host.get_position().filament;

            let sense_travel = self.config.sense_travel;
            let trigger = match self.home_filament(
                Sensor::SelectorFilament,
                -sense_travel,
                self.config.selector_sense_speed,
                false,
            ) {
                Ok(Some(position)) => position,
                Ok(None) => {
                    self.raise_servo_quietly();
                    return Err(RackError::unload_failed(
                        self.curr_lane,
                        "Selector sensor still triggered after full movement",
                    ));
                },
                Err(e) => {
                    self.raise_servo_quietly();
                    return Err(e);
                },
            };

            if let Some(base) = base_length {
                let length = move_start - trigger.filament + base - self.config.target_selector_homing_dist;
                self.record_bowden_unload(length, reached_early);
            }
        } else {
            let lane = self.curr_lane.ok_or(ValidationError::SelectorNotAtLane)?;
            info!(lane, "No filament at selector, loading it before unloading");
            self.load_selector(lane)?;
        }

        self.reset_filament_position()?;
        self.move_filament(-self.config.selector_unload_length, self.config.selector_unload_speed)?;
        self.reset_filament_position()?;
        self.raise_servo()
    }

    pub(super) fn set_active_lane_inner(&mut self, lane: usize) {
        let selector = self.positions.position(lane).unwrap_or_default();
        let pos = self.host.get_position().with_selector(selector);
        self.host.set_position(pos, &[Axis::Selector]);
        self.host.enable_motor(Axis::Selector);

        self.curr_lane = Some(lane);
        self.active_lane = Some(lane);
        self.runout.arm();
        self.persist_active_lane();
        self.events.emit(RackEvent::ActiveLaneForced { lane });
        info!(lane, "Active lane set");
    }

    pub(super) fn locate_selector_inner(&mut self) -> Result<Located, RackError> {
        if !self.selector_has_filament() {
            if self.active_lane.take().is_some() {
                self.persist_active_lane();
            }
            if !self.is_selector_homed() {
                self.home_selector_inner()?;
            }
            return Ok(Located::Resolved);
        }

        match (self.is_selector_homed(), self.active_lane, self.curr_lane) {
            (true, Some(_), _) => Ok(Located::Resolved),
            (true, None, Some(_)) => {
                info!("Unloading selector filament of an inactive lane");
                self.unload_selector(None, true)?;
                Ok(Located::Resolved)
            },
            (false, Some(active), _) => {
                self.set_active_lane_inner(active);
                Ok(Located::Resolved)
            },
            (true, None, None) | (false, None, _) => Ok(Located::NeedsUser),
        }
    }
}

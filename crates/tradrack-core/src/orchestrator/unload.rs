//! Toolhead unload sequence.

use tracing::info;
use tradrack_types::{MotionSource, RackError, RackEvent, ResumeAction, Sensor, ValidationError};

use super::ToolChangeOrchestrator;
use crate::host::{MotionHost, ProcessControl};
use crate::storage::VariableStore;

/// Where unloaded filament ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnloadMode {
    /// Park behind the selector sensor and learn the bowden unload length
    Normal,
    /// Eject the remaining tail of a run-out spool past the selector
    Runout,
}

impl<H: MotionHost, S: VariableStore, P: ProcessControl> ToolChangeOrchestrator<H, S, P> {
    /// Retract the active filament out of the toolhead and park it at the
    /// selector.
    pub fn unload_toolhead(&mut self) -> Result<(), RackError> {
        self.ensure_idle()?;
        match self.unload_toolhead_inner(UnloadMode::Normal) {
            Ok(()) => self.take_persist_error(),
            Err(e) => Err(self.interrupt(ResumeAction::UnloadToolhead, e)),
        }
    }

    pub(super) fn unload_toolhead_inner(&mut self, mode: UnloadMode) -> Result<(), RackError> {
        let lane = match self.curr_lane {
            Some(lane) if self.is_selector_homed() => lane,
            _ => return Err(ValidationError::SelectorNotAtLane.into()),
        };

        if self.active_lane.take().is_some() {
            self.persist_active_lane();
        }
        self.runout.disarm();
        info!(lane, ?mode, "Unloading toolhead");
        self.events.emit(RackEvent::UnloadStarted { lane });

        self.host.wait_for_motion_drain(MotionSource::Machine)?;
        self.lower_servo_inner(true)?;
        self.reset_filament_position()?;
        self.sync_extruder_to_driver();

        if self.config.unloads_with_toolhead_sensor() {
            let sense_travel = self.config.sense_travel;
            let cleared = self.home_filament(
                Sensor::ToolheadFilament,
                -sense_travel,
                self.config.toolhead_sense_speed(),
                false,
            );
            match cleared {
                Ok(Some(_)) => {},
                Ok(None) => {
                    return Err(RackError::unload_failed(
                        Some(lane),
                        "Toolhead sensor still triggered after full movement",
                    ));
                },
                Err(e) => return Err(e),
            }
        }

        self.reset_filament_position()?;
        self.move_filament(-self.config.toolhead_unload_length(), self.config.toolhead_unload_speed())?;
        self.host.wait_for_motion_drain(MotionSource::Rack)?;
        self.unsync();

        match mode {
            UnloadMode::Normal => self.unload_bowden(lane)?,
            UnloadMode::Runout => {
                let eject = self.bowden_unload.length()
                    + self.config.selector_unload_length
                    + self.config.eject_length;
                self.move_filament(-eject, self.config.buffer_pull_speed())?;
                self.reset_filament_position()?;
                self.raise_servo()?;
            },
        }

        self.events.emit(RackEvent::UnloadComplete { lane });
        info!(lane, "Toolhead unloaded");
        Ok(())
    }

    /// Pull filament back through the bowden and park it at the selector.
    fn unload_bowden(&mut self, lane: usize) -> Result<(), RackError> {
        let speed = self.config.buffer_pull_speed();
        let move_start = self.host.get_position().filament;
        let bowden_length = self.bowden_unload.length();

        let mut target = self.host.get_position().advance(-bowden_length);
        let mut reached_early = true;
        match self.home_filament(Sensor::SelectorFilament, -bowden_length, speed, false)? {
            Some(trigger) => {
                target = trigger.with_filament(trigger.filament + self.config.fil_homing_retract_dist);
            },
            None => reached_early = false,
        }
        self.host.enqueue_move(target, speed)?;

        self.unload_selector(Some(move_start - target.filament), reached_early)?;
        self.lanes[lane].unloaded = true;
        Ok(())
    }
}

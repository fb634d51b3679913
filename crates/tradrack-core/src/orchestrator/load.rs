//! Toolhead load sequence.

use tracing::{debug, info, warn};
use tradrack_types::{
    LoadPhase, LoadRequest, LoadTarget, MotionSource, RackError, RackEvent, ResumeAction, Sensor,
};

use super::motion::ServoRaise;
use super::unload::UnloadMode;
use super::ToolChangeOrchestrator;
use crate::host::{MotionHost, ProcessControl};
use crate::storage::VariableStore;

impl<H: MotionHost, S: VariableStore, P: ProcessControl> ToolChangeOrchestrator<H, S, P> {
    /// Load a lane (or a tool's lane) into the toolhead.
    ///
    /// Any filament currently in the selector is unloaded first. On failure
    /// the servo is raised, the steppers are unsynced, a retry is left on the
    /// resume stack and the process is paused.
    pub fn load_toolhead(&mut self, request: LoadRequest) -> Result<(), RackError> {
        self.ensure_idle()?;
        match self.load_toolhead_inner(&request) {
            Ok(()) => self.take_persist_error(),
            Err(e) => {
                let retry = self.next_lane.map_or_else(|| request.clone(), |lane| request.pinned_to(lane));
                Err(self.interrupt(ResumeAction::LoadToolhead(retry), e))
            },
        }
    }

    /// Switch to `tool`, the usual tool-change entry point.
    pub fn select_tool(&mut self, tool: usize) -> Result<(), RackError> {
        self.load_toolhead(LoadRequest::tool(tool))
    }

    pub(super) fn load_toolhead_inner(&mut self, request: &LoadRequest) -> Result<(), RackError> {
        // Validate
        let mut lane = match request.target {
            LoadTarget::Lane(lane) => {
                self.check_lane(lane)?;
                lane
            },
            LoadTarget::Tool(tool) => {
                if self.active_lane.is_some_and(|active| self.tool_map.tool_of(active) == Some(tool)) {
                    debug!(tool, "Tool already loaded");
                    return Ok(());
                }
                self.tool_map.lane_for_tool(tool)?
            },
        };
        if self.active_lane == Some(lane) {
            debug!(lane, "Lane already loaded");
            return Ok(());
        }
        self.next_lane = Some(lane);

        // CheckHomed
        if !self.is_selector_homed() {
            return Err(RackError::SelectorNotHomed);
        }

        if let Some(temperature) = request.heater_target {
            self.host.set_heater_target(temperature, true)?;
        }
        info!(lane, target = ?request.target, "Loading toolhead");
        self.events.emit(RackEvent::LoadStarted { lane });

        // UnloadCurrent
        self.host.wait_for_motion_drain(MotionSource::Machine)?;
        if self.selector_has_filament() && self.curr_lane != Some(lane) {
            if let Err(e) = self.unload_toolhead_inner(UnloadMode::Normal) {
                let current = self.curr_lane;
                if let Some(curr) = current {
                    self.lanes[curr].unloaded = false;
                }
                self.retry_lane = current;
                return Err(match e {
                    RackError::UnloadFailed { reason, .. } => {
                        RackError::load_failed(current, LoadPhase::UnloadCurrent, reason)
                    },
                    other => other,
                });
            }
        }

        // LoadSelector
        match self.load_selector(lane) {
            Ok(()) => {},
            Err(e @ RackError::LoadFailed { .. }) => {
                self.lanes[lane].dead = true;
                if !request.target.allows_failover() {
                    self.retry_lane = Some(lane);
                    return Err(e);
                }
                warn!(lane, error = %e, "Lane failed to load, looking for a replacement");
                match self.find_replacement_lane(lane)? {
                    Some(replacement) => {
                        lane = replacement;
                        self.next_lane = Some(lane);
                        self.events.emit(RackEvent::LoadStarted { lane });
                    },
                    None => {
                        self.retry_lane = Some(lane);
                        return Err(RackError::load_failed(
                            Some(lane),
                            LoadPhase::LoadSelector,
                            "No lane assigned to this tool could be loaded",
                        ));
                    },
                }
            },
            Err(e) => return Err(e),
        }

        self.load_from_selector(lane, request)
    }

    /// Bowden transit through finalization, with filament already at the
    /// selector sensor of `lane`.
    pub(super) fn load_from_selector(&mut self, lane: usize, request: &LoadRequest) -> Result<(), RackError> {
        let bowden_length = request.bowden_length.unwrap_or_else(|| self.bowden_load.length());
        let extruder_load_length = request.extruder_load_length.unwrap_or(self.config.extruder_load_length);
        let hotend_load_length = request.hotend_load_length.unwrap_or(self.config.hotend_load_length);

        // BowdenTransit
        self.reset_filament_position()?;
        let move_start = self.host.get_position().filament;
        let speed = if self.lanes[lane].unloaded {
            self.config.buffer_pull_speed()
        } else {
            self.config.spool_pull_speed
        };
        let mut target = self.host.get_position().advance(bowden_length);
        let mut reached_early = true;
        if self.config.loads_with_toolhead_sensor() {
            match self.home_filament(Sensor::ToolheadFilament, bowden_length, speed, true)? {
                Some(trigger) => {
                    target = trigger.with_filament(trigger.filament - self.config.fil_homing_retract_dist);
                    debug!(lane, at = trigger.filament, "Toolhead sensor reached during bowden transit");
                },
                None => reached_early = false,
            }
        }
        self.host.enqueue_move(target, speed)?;
        let base_length = target.filament - move_start;

        // SyncExtruderToDriver
        self.reset_filament_position()?;
        self.sync_extruder_to_driver();

        // HomeToToolheadSensor
        if self.config.loads_with_toolhead_sensor() {
            let move_start = self.host.get_position().filament;
            let sense_travel = self.config.sense_travel;
            let trigger = match self.home_filament(
                Sensor::ToolheadFilament,
                sense_travel,
                self.config.toolhead_sense_speed(),
                true,
            ) {
                Ok(Some(trigger)) => trigger,
                Ok(None) => {
                    self.retry_lane = Some(lane);
                    return Err(RackError::load_failed(
                        Some(lane),
                        LoadPhase::HomeToToolheadSensor,
                        "No trigger on toolhead sensor after full movement",
                    ));
                },
                Err(e) => {
                    self.retry_lane = Some(lane);
                    return Err(e);
                },
            };
            let length = trigger.filament - move_start + base_length - self.config.target_toolhead_homing_dist();
            self.record_bowden_load(length, reached_early);
        }

        // FinishExtruderLoad
        self.reset_filament_position()?;
        self.move_filament(extruder_load_length, self.config.extruder_load_speed)?;
        self.move_filament(hotend_load_length, self.config.hotend_load_speed)?;
        if !self.config.sync_to_extruder {
            // Lift the servo while the hotend load is still running
            let servo_wait = self.config.servo_wait();
            let hotend_load_time = if hotend_load_length > 0.0 {
                self.host.last_move_duration(MotionSource::Rack)
            } else {
                0.0
            };
            let servo_delay = (servo_wait - hotend_load_time).max(0.0);
            let print_time = self.host.last_move_time(MotionSource::Rack) - servo_wait + servo_delay;
            self.raise_servo_with(ServoRaise {
                rack_dwell: false,
                wait_moves: false,
                print_time: Some(print_time),
                ..ServoRaise::default()
            })?;
            if servo_delay > 0.0 {
                self.host.dwell(MotionSource::Rack, servo_delay);
            }
        }

        // RestoreSync
        self.host.wait_for_motion_drain(MotionSource::Rack)?;
        if self.config.sync_to_extruder {
            self.sync_driver_to_extruder();
            self.lower_servo_inner(false)?;
        } else {
            self.unsync();
        }

        // Finalize
        self.finish_load(lane, request);
        Ok(())
    }

    fn finish_load(&mut self, lane: usize, request: &LoadRequest) {
        self.active_lane = Some(lane);
        self.curr_lane = Some(lane);
        self.lanes[lane].dead = false;
        if let Some(tool) = self.tool_map.tool_of(lane) {
            if let Err(e) = self.tool_map.set_default(tool, Some(lane)) {
                warn!(error = %e, lane, tool, "Could not update default lane");
            }
        }
        self.runout.arm();
        self.persist_active_lane();
        if let Some(temperature) = request.heater_target {
            self.persist_heater_target(temperature);
        }
        self.retry_lane = None;
        self.next_lane = None;
        self.events.emit(RackEvent::LoadComplete { lane });
        info!(lane, "Toolhead loaded");
    }

    /// Reload the lane a failed load left behind, if any.
    pub(super) fn reload_retry_lane(&mut self) -> Result<(), RackError> {
        if let Some(lane) = self.retry_lane {
            info!(lane, "Reloading lane before retry");
            self.load_lane_inner(lane, false)?;
            self.retry_lane = None;
        }
        Ok(())
    }
}

//! Low-level motion helpers: servo, selector positioning, filament zeroing
//! and the stepper sync transitions.

use tracing::{debug, error, info, warn};
use tradrack_types::{
    Axis, HomingRequest, HostError, MotionSource, RackError, RackEvent, RackPosition, Sensor,
    StepperId, ValidationError,
};

use super::ToolChangeOrchestrator;
use crate::host::{MotionHost, ProcessControl};
use crate::storage::VariableStore;

/// How a servo raise is scheduled.
#[derive(Debug, Clone, Copy)]
pub(super) struct ServoRaise {
    /// Dwell the machine toolhead for the settle time
    pub toolhead_dwell: bool,
    /// Dwell the rack for the settle time
    pub rack_dwell: bool,
    /// Drain rack motion before moving the servo
    pub wait_moves: bool,
    /// Schedule the servo at this print time instead of now
    pub print_time: Option<f64>,
}

impl Default for ServoRaise {
    fn default() -> Self {
        Self { toolhead_dwell: false, rack_dwell: true, wait_moves: true, print_time: None }
    }
}

impl<H: MotionHost, S: VariableStore, P: ProcessControl> ToolChangeOrchestrator<H, S, P> {
    /// Engage the drive gear with the lane under the selector.
    ///
    /// Without `force`, the selector must be homed and sitting at a lane.
    pub fn lower_servo(&mut self, force: bool) -> Result<(), RackError> {
        if !force && (self.curr_lane.is_none() || !self.is_selector_homed()) {
            return Err(ValidationError::SelectorNotAtLane.into());
        }
        self.lower_servo_inner(false)
    }

    /// Disengage the drive gear.
    pub fn raise_servo(&mut self) -> Result<(), RackError> {
        self.raise_servo_with(ServoRaise::default())
    }

    /// Home the selector against its endstop.
    pub fn home_selector(&mut self) -> Result<(), RackError> {
        self.ensure_idle()?;
        self.home_selector_inner()
    }

    /// Move the selector to `lane` with the servo raised.
    pub fn go_to_lane(&mut self, lane: usize) -> Result<(), RackError> {
        self.ensure_idle()?;
        self.go_to_lane_inner(lane)
    }

    pub(super) fn lower_servo_inner(&mut self, toolhead_dwell: bool) -> Result<(), RackError> {
        self.host.wait_for_motion_drain(MotionSource::Rack)?;
        self.host.set_servo_angle(self.config.servo_down_angle, None);
        if self.servo_raised != Some(false) {
            let wait = self.config.servo_wait();
            self.host.dwell(MotionSource::Rack, wait);
            if toolhead_dwell {
                self.host.dwell(MotionSource::Machine, wait);
            }
        }
        self.servo_raised = Some(false);
        Ok(())
    }

    pub(super) fn raise_servo_with(&mut self, raise: ServoRaise) -> Result<(), RackError> {
        if raise.wait_moves {
            self.host.wait_for_motion_drain(MotionSource::Rack)?;
        }
        self.host.set_servo_angle(self.config.servo_up_angle, raise.print_time);
        if self.servo_raised != Some(true) {
            let wait = self.config.servo_wait();
            if raise.rack_dwell {
                self.host.dwell(MotionSource::Rack, wait);
            }
            if raise.toolhead_dwell {
                self.host.dwell(MotionSource::Machine, wait);
            }
        }
        self.servo_raised = Some(true);
        Ok(())
    }

    /// Raise the servo on an error path, where a second failure is only logged.
    pub(super) fn raise_servo_quietly(&mut self) {
        if let Err(e) = self.raise_servo() {
            error!(error = %e, "Failed to raise servo");
        }
    }

    pub(super) fn home_selector_inner(&mut self) -> Result<(), RackError> {
        if self.selector_has_filament() {
            return Err(ValidationError::SelectorOccupied { action: "home the selector".to_string() }.into());
        }
        self.curr_lane = None;
        self.raise_servo()?;

        if let Err(e) = self.host.home_axis(Axis::Selector) {
            if self.host.is_shutdown() {
                return Err(RackError::Shutdown { message: e.to_string() });
            }
            self.host.motor_off();
            return Err(e.into());
        }
        info!("Selector homed");
        Ok(())
    }

    pub(super) fn go_to_lane_inner(&mut self, lane: usize) -> Result<(), RackError> {
        if !self.is_selector_homed() {
            return Err(RackError::SelectorNotHomed);
        }
        self.check_lane(lane)?;
        if self.curr_lane == Some(lane) {
            return Ok(());
        }
        if self.selector_has_filament() {
            return Err(ValidationError::SelectorOccupied { action: format!("move to lane {lane}") }.into());
        }

        self.raise_servo()?;
        let target = self.positions.position(lane).unwrap_or_default();
        let pos = self.host.get_position().with_selector(target);
        self.host.enqueue_move(pos, self.config.selector_max_velocity)?;
        self.curr_lane = Some(lane);
        debug!(lane, position = target, "Selector moved");
        Ok(())
    }

    pub(super) fn is_selector_homed(&self) -> bool {
        self.host.is_homed(Axis::Selector)
    }

    pub(super) fn selector_has_filament(&mut self) -> bool {
        self.host.query_sensor(Sensor::SelectorFilament)
    }

    /// Zero the filament axis once every queued step has been generated.
    pub(super) fn reset_filament_position(&mut self) -> Result<(), RackError> {
        self.host.wait_for_motion_drain(MotionSource::Rack)?;
        self.host.flush_step_generation(MotionSource::Rack);
        let pos = self.host.get_position().with_filament(0.0);
        self.host.set_position(pos, &[Axis::FilamentDriver]);
        if self.sync.is_extruder_synced() {
            self.host.set_stepper_position(StepperId::Extruder, 0.0);
        }
        Ok(())
    }

    /// Filament move relative to the current position.
    pub(super) fn move_filament(&mut self, delta: f64, velocity: f64) -> Result<RackPosition, RackError> {
        let pos = self.host.get_position().advance(delta);
        self.host.enqueue_move(pos, velocity)?;
        Ok(pos)
    }

    /// Filament homing move of `travel` relative to the current position.
    ///
    /// Returns `None` when the move completed without a transition.
    pub(super) fn home_filament(
        &mut self,
        sensor: Sensor,
        travel: f64,
        velocity: f64,
        triggered: bool,
    ) -> Result<Option<RackPosition>, RackError> {
        let target = self.host.get_position().advance(travel);
        let mut request = HomingRequest::new(sensor, target, velocity).probing();
        if !triggered {
            request = request.until_cleared();
        }
        match self.host.home_until_sensor(&request) {
            Ok(position) => Ok(Some(position)),
            Err(HostError::NoTrigger) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub(super) fn sync_extruder_to_driver(&mut self) {
        if self.sync.is_driver_synced() {
            self.unsync();
        }
        self.sync.sync_extruder_to_driver(&mut self.host, &mut self.events);
    }

    pub(super) fn sync_driver_to_extruder(&mut self) {
        if self.sync.is_extruder_synced() {
            self.unsync();
        }
        self.sync.sync_driver_to_extruder(&mut self.host, &mut self.events);
        self.notify_sync_sensor(RackEvent::SyncedToExtruder);
    }

    pub(super) fn unsync(&mut self) {
        if self.sync.is_driver_synced() {
            self.notify_sync_sensor(RackEvent::UnsyncingFromExtruder);
        }
        self.sync.unsync(&mut self.host, &mut self.events);
    }

    /// Let the filament driver follow the extruder with the drive gear engaged.
    pub fn sync_to_extruder(&mut self) -> Result<(), RackError> {
        self.ensure_idle()?;
        if self.curr_lane.is_none() || !self.is_selector_homed() {
            return Err(ValidationError::SelectorNotAtLane.into());
        }
        self.sync_driver_to_extruder();
        self.lower_servo_inner(false)
    }

    /// Return the filament driver to the rack and disengage it.
    pub fn unsync_from_extruder(&mut self) -> Result<(), RackError> {
        self.unsync();
        self.raise_servo()
    }

    /// Scale the filament driver relative to the extruder while synced.
    pub fn set_driver_multiplier(&mut self, factor: f64) -> Result<(), RackError> {
        self.sync.set_driver_multiplier(&mut self.host, factor)?;
        Ok(())
    }

    /// Feed a sync sensor edge to the add-on.
    pub fn sync_sensor_changed(&mut self, compressed: bool) {
        let multiplier = self.sync_sensor.as_mut().and_then(|s| s.handle_sensor(compressed));
        self.apply_sync_multiplier(multiplier);
    }

    /// Feed the extruder's current and past positions to the add-on.
    pub fn update_extruder_direction(&mut self, current_position: f64, past_position: f64) {
        let multiplier = self
            .sync_sensor
            .as_mut()
            .and_then(|s| s.update_direction(current_position, past_position));
        self.apply_sync_multiplier(multiplier);
    }

    fn notify_sync_sensor(&mut self, event: RackEvent) {
        let driver_synced = self.sync.is_driver_synced();
        let multiplier = self.sync_sensor.as_mut().and_then(|s| s.handle_event(event, driver_synced));
        self.apply_sync_multiplier(multiplier);
    }

    fn apply_sync_multiplier(&mut self, multiplier: Option<f64>) {
        let Some(factor) = multiplier else {
            return;
        };
        if let Err(e) = self.sync.set_driver_multiplier(&mut self.host, factor) {
            warn!(error = %e, factor, "Sync sensor multiplier not applied");
        }
    }
}

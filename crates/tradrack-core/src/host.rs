//! Collaborator traits implemented by the embedding motion host.
//!
//! The engine is single-threaded and cooperative: every call below is made
//! from the one executor that also delivers sensor edges. Moves return once
//! they are queued; `wait_for_motion_drain` is the only call that blocks until
//! motion has physically completed.

use tradrack_types::{
    Axis, HomingRequest, HostError, MotionSource, RackPosition, Sensor, StepperBinding, StepperId,
};

/// Motion planner, homing, kinematics and sensor access.
pub trait MotionHost {
    /// Queue a move of the rack's own motion source.
    fn enqueue_move(&mut self, target: RackPosition, velocity: f64) -> Result<(), HostError>;

    /// Block until all queued motion of `source` has completed.
    fn wait_for_motion_drain(&mut self, source: MotionSource) -> Result<(), HostError>;

    /// Generate all pending steps of `source` so no queued motion refers to
    /// the current stepper bindings any more.
    fn flush_step_generation(&mut self, source: MotionSource);

    /// Move toward `request.target` until a sensor reaches the requested state.
    ///
    /// Returns the stop (or probed trigger) position, or
    /// [`HostError::NoTrigger`] if the full move completed without a
    /// transition.
    fn home_until_sensor(&mut self, request: &HomingRequest) -> Result<RackPosition, HostError>;

    /// Run the axis homing procedure against its endstop.
    fn home_axis(&mut self, axis: Axis) -> Result<(), HostError>;

    fn is_homed(&self, axis: Axis) -> bool;

    /// Commanded position of the rack's motion source.
    fn get_position(&self) -> RackPosition;

    /// Overwrite the commanded position, marking `homed_axes` as homed.
    fn set_position(&mut self, position: RackPosition, homed_axes: &[Axis]);

    /// Update the endstop position used by future homing of `axis`.
    fn set_endstop_position(&mut self, axis: Axis, position: f64);

    fn enable_motor(&mut self, axis: Axis);

    /// Release an axis motor; the axis becomes unhomed.
    fn disable_motor(&mut self, axis: Axis);

    /// Release every motor on the machine.
    fn motor_off(&mut self);

    fn is_shutdown(&self) -> bool;

    /// Current filament-axis coordinate of a motion source (the rack's
    /// filament axis, or the machine's extruder axis).
    fn source_position(&self, source: MotionSource) -> f64;

    /// Point a stepper at a new motion source and kinematic solver.
    ///
    /// Returns the binding it had before.
    fn rebind_stepper(&mut self, stepper: StepperId, binding: StepperBinding) -> StepperBinding;

    /// Reset a stepper's logical position within its current binding.
    fn set_stepper_position(&mut self, stepper: StepperId, position: f64);

    fn register_step_generator(&mut self, source: MotionSource, stepper: StepperId);

    fn unregister_step_generator(&mut self, source: MotionSource, stepper: StepperId);

    fn distance_per_revolution(&self, stepper: StepperId) -> f64;

    fn set_distance_per_revolution(&mut self, stepper: StepperId, value: f64);

    fn query_sensor(&mut self, sensor: Sensor) -> bool;

    /// Set the coupling servo, optionally scheduled at `print_time`.
    fn set_servo_angle(&mut self, angle: f64, print_time: Option<f64>);

    /// Print time at which the last queued move of `source` ends.
    fn last_move_time(&mut self, source: MotionSource) -> f64;

    /// Minimum duration of the last queued move of `source`.
    fn last_move_duration(&self, source: MotionSource) -> f64;

    fn dwell(&mut self, source: MotionSource, seconds: f64);

    /// Set the hotend target temperature, optionally waiting to reach it.
    fn set_heater_target(&mut self, temperature: f64, wait: bool) -> Result<(), HostError>;
}

/// Pause/resume controller of the running print.
pub trait ProcessControl {
    fn pause(&mut self);
    fn resume(&mut self);
    fn is_paused(&self) -> bool;
    fn is_printing(&self) -> bool;
}

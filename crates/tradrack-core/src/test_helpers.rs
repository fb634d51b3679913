//! Deterministic simulated host for engine tests.
//!
//! Filament is modelled as one tip position per lane, measured along the
//! filament path from the selector sensor (0) toward the toolhead. A parked
//! lane sits at `-selector_unload_length`. The lane under the selector moves
//! with the filament axis only while the servo is down.

use std::cell::Cell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use serde_json::Value;
use tradrack_types::{
    Axis, HomingRequest, HostError, MotionSource, RackConfig, RackPosition, Sensor, StepperBinding,
    StepperId,
};

use crate::error::StoreResult;
use crate::host::{MotionHost, ProcessControl};
use crate::storage::{MemoryStore, VariableStore};

/// Stop offset used when a homing move waits for a sensor to clear.
pub(crate) const CLEAR_MARGIN: f64 = 0.01;

/// Extra path length between the configured bowden length and the toolhead
/// sensor in the default simulation.
pub(crate) const TOOLHEAD_SENSOR_EXTRA: f64 = 20.0;

/// Every call the engine made, in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HostCall {
    Move(RackPosition, f64),
    Drain(MotionSource),
    Flush(MotionSource),
    Home(HomingRequest),
    HomeAxis(Axis),
    SetPosition(RackPosition),
    SetEndstop(Axis, f64),
    EnableMotor(Axis),
    DisableMotor(Axis),
    MotorOff,
    Rebind(StepperId, StepperBinding),
    SetStepperPosition(StepperId, f64),
    Register(MotionSource, StepperId),
    Unregister(MotionSource, StepperId),
    SetDpr(StepperId, f64),
    Servo(f64, Option<f64>),
    Dwell(MotionSource, f64),
    Heater(f64, bool),
}

/// Outcome forced onto the next homing move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Scripted {
    /// Run the physical model
    Model,
    /// Exhaust the full move without a trigger
    NoTrigger,
}

#[derive(Debug)]
pub(crate) struct SimHost {
    pub pos: RackPosition,
    /// Physical minus logical selector position
    pub selector_offset: f64,
    pub endstop_physical: f64,
    pub endstop_position: f64,
    pub homed: HashSet<Axis>,
    pub motors_enabled: HashSet<Axis>,
    pub servo_angle: Option<f64>,
    pub servo_down_angle: f64,
    pub lane_positions: Vec<f64>,
    pub tips: Vec<Option<f64>>,
    pub run_out: Vec<bool>,
    pub has_toolhead_sensor: bool,
    pub toolhead_sensor_at: f64,
    pub forced_sensors: HashMap<Sensor, bool>,
    pub scripted: VecDeque<Scripted>,
    pub bindings: HashMap<StepperId, StepperBinding>,
    pub generators: HashMap<MotionSource, Vec<StepperId>>,
    pub dpr: HashMap<StepperId, f64>,
    pub stepper_positions: HashMap<StepperId, f64>,
    pub extruder_pos: f64,
    pub print_time: f64,
    pub last_duration: f64,
    pub shutdown: bool,
    pub heater_target: Option<f64>,
    pub calls: Vec<HostCall>,
}

impl SimHost {
    /// Homed selector, every lane parked behind the selector sensor.
    pub fn new(config: &RackConfig) -> Self {
        let lane_positions = crate::lanes::LanePositionTable::from_config(config).positions().to_vec();
        let lane_count = lane_positions.len();
        let mut generators = HashMap::new();
        generators.insert(MotionSource::Rack, vec![StepperId::FilamentDriver]);
        generators.insert(MotionSource::Machine, vec![StepperId::Extruder]);
        let bindings = [StepperId::FilamentDriver, StepperId::Extruder]
            .into_iter()
            .map(|s| (s, s.home_binding()))
            .collect();
        let dpr = [(StepperId::FilamentDriver, 22.68), (StepperId::Extruder, 5.7)].into_iter().collect();

        Self {
            pos: RackPosition::default(),
            selector_offset: 0.0,
            endstop_physical: 0.0,
            endstop_position: 0.0,
            homed: [Axis::Selector].into_iter().collect(),
            motors_enabled: [Axis::Selector, Axis::FilamentDriver].into_iter().collect(),
            servo_angle: None,
            servo_down_angle: config.servo_down_angle,
            lane_positions,
            tips: vec![Some(-config.selector_unload_length); lane_count],
            run_out: vec![false; lane_count],
            has_toolhead_sensor: config.has_toolhead_sensor,
            toolhead_sensor_at: config.bowden_length + TOOLHEAD_SENSOR_EXTRA,
            forced_sensors: HashMap::new(),
            scripted: VecDeque::new(),
            bindings,
            generators,
            dpr,
            stepper_positions: HashMap::new(),
            extruder_pos: 0.0,
            print_time: 0.0,
            last_duration: 0.0,
            shutdown: false,
            heater_target: None,
            calls: Vec::new(),
        }
    }

    pub fn script(&mut self, outcome: Scripted) {
        self.scripted.push_back(outcome);
    }

    pub fn force_sensor(&mut self, sensor: Sensor, state: bool) {
        self.forced_sensors.insert(sensor, state);
    }

    /// The spool of `lane` is exhausted; its tail has passed the selector.
    pub fn run_out(&mut self, lane: usize) {
        self.run_out[lane] = true;
    }

    pub fn empty_lane(&mut self, lane: usize) {
        self.tips[lane] = None;
    }

    /// Put lane filament tip at `tip`.
    pub fn place_tip(&mut self, lane: usize, tip: f64) {
        self.tips[lane] = Some(tip);
    }

    /// Physically move the selector to `lane` by hand (motor released).
    pub fn align_selector(&mut self, lane: usize) {
        let physical = self.lane_positions[lane];
        self.selector_offset = physical - self.pos.selector;
    }

    pub fn selector_physical(&self) -> f64 {
        self.pos.selector + self.selector_offset
    }

    pub fn engaged_lane(&self) -> Option<usize> {
        let physical = self.selector_physical();
        self.lane_positions.iter().position(|p| (p - physical).abs() <= 0.01)
    }

    pub fn servo_down(&self) -> bool {
        self.servo_angle.is_some_and(|a| (a - self.servo_down_angle).abs() < f64::EPSILON)
    }

    fn driven_lane(&self) -> Option<usize> {
        if !self.servo_down() {
            return None;
        }
        self.engaged_lane().filter(|lane| self.tips[*lane].is_some())
    }

    fn shift_tip(&mut self, delta: f64) {
        if let Some(lane) = self.driven_lane() {
            if let Some(tip) = self.tips[lane].as_mut() {
                *tip += delta;
            }
        }
    }

    /// Tip position at which `sensor` flips, and its reading for a tip.
    fn sensor_threshold(&self, sensor: Sensor) -> f64 {
        match sensor {
            Sensor::ToolheadFilament => self.toolhead_sensor_at,
            _ => 0.0,
        }
    }

    fn filament_sensor_state(&self, sensor: Sensor) -> bool {
        if let Some(forced) = self.forced_sensors.get(&sensor) {
            return *forced;
        }
        match sensor {
            Sensor::SelectorFilament => self.engaged_lane().is_some_and(|lane| {
                !self.run_out[lane] && self.tips[lane].is_some_and(|tip| tip >= 0.0)
            }),
            Sensor::ToolheadFilament => {
                self.has_toolhead_sensor
                    && self.tips.iter().flatten().any(|tip| *tip >= self.toolhead_sensor_at)
            },
            Sensor::SelectorEndstop => self.selector_physical() <= self.endstop_physical + 1e-9,
        }
    }

    fn advance_clock(&mut self, distance: f64, velocity: f64) {
        self.last_duration = if velocity > 0.0 { distance.abs() / velocity } else { 0.0 };
        self.print_time += self.last_duration;
    }

    fn home_filament(&mut self, request: &HomingRequest) -> Result<RackPosition, HostError> {
        let start = self.pos;
        let delta = request.target.filament - start.filament;
        let finish = |host: &mut Self| -> Result<RackPosition, HostError> {
            host.shift_tip(delta);
            host.pos = request.target;
            host.advance_clock(delta, request.velocity);
            Err(HostError::NoTrigger)
        };

        let sensor = request.sensors[0];
        if self.filament_sensor_state(sensor) == request.triggered {
            return Ok(start);
        }
        if self.forced_sensors.contains_key(&sensor) {
            return finish(self);
        }
        if sensor == Sensor::SelectorFilament
            && self.engaged_lane().is_some_and(|lane| self.run_out[lane])
        {
            return finish(self);
        }
        let Some(lane) = self.driven_lane() else {
            return finish(self);
        };
        let Some(tip) = self.tips[lane] else {
            return finish(self);
        };

        let threshold = self.sensor_threshold(sensor);
        let stop_tip = if request.triggered { threshold } else { threshold - CLEAR_MARGIN };
        let needed = stop_tip - tip;
        // Reachable only when moving toward the threshold far enough
        if needed.abs() > delta.abs() || needed.signum() != delta.signum() {
            return finish(self);
        }

        self.tips[lane] = Some(stop_tip);
        self.pos = start.advance(needed);
        self.advance_clock(needed, request.velocity);
        Ok(self.pos)
    }

    fn home_selector_endstop(&mut self, request: &HomingRequest) -> Result<RackPosition, HostError> {
        let start = self.pos;
        if self.filament_sensor_state(Sensor::SelectorEndstop) {
            return Ok(start);
        }
        let needed = self.endstop_physical - self.selector_physical();
        let delta = request.target.selector - start.selector;
        if needed.abs() > delta.abs() || needed.signum() != delta.signum() {
            self.pos = request.target;
            return Err(HostError::NoTrigger);
        }
        self.pos = start.with_selector(start.selector + needed);
        Ok(self.pos)
    }

    pub fn homing_calls(&self) -> Vec<&HomingRequest> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HostCall::Home(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn index_of(&self, call: &HostCall) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }
}

impl MotionHost for SimHost {
    fn enqueue_move(&mut self, target: RackPosition, velocity: f64) -> Result<(), HostError> {
        if self.shutdown {
            return Err(HostError::Shutdown { message: "simulated shutdown".to_string() });
        }
        self.calls.push(HostCall::Move(target, velocity));
        let delta = target.filament - self.pos.filament;
        let distance = delta.abs().max((target.selector - self.pos.selector).abs());
        self.shift_tip(delta);
        self.pos = target;
        self.advance_clock(distance, velocity);
        Ok(())
    }

    fn wait_for_motion_drain(&mut self, source: MotionSource) -> Result<(), HostError> {
        self.calls.push(HostCall::Drain(source));
        if self.shutdown {
            return Err(HostError::Shutdown { message: "simulated shutdown".to_string() });
        }
        Ok(())
    }

    fn flush_step_generation(&mut self, source: MotionSource) {
        self.calls.push(HostCall::Flush(source));
    }

    fn home_until_sensor(&mut self, request: &HomingRequest) -> Result<RackPosition, HostError> {
        self.calls.push(HostCall::Home(request.clone()));
        if self.shutdown {
            return Err(HostError::Shutdown { message: "simulated shutdown".to_string() });
        }
        if self.scripted.pop_front() == Some(Scripted::NoTrigger) {
            let delta = request.target.filament - self.pos.filament;
            self.shift_tip(delta);
            self.pos = request.target;
            return Err(HostError::NoTrigger);
        }
        if request.sensors.contains(&Sensor::SelectorEndstop) {
            self.home_selector_endstop(request)
        } else {
            self.home_filament(request)
        }
    }

    fn home_axis(&mut self, axis: Axis) -> Result<(), HostError> {
        self.calls.push(HostCall::HomeAxis(axis));
        if self.shutdown {
            return Err(HostError::Shutdown { message: "simulated shutdown".to_string() });
        }
        if axis == Axis::Selector {
            self.pos.selector = self.endstop_position;
            self.selector_offset = self.endstop_physical - self.endstop_position;
        }
        self.homed.insert(axis);
        self.motors_enabled.insert(axis);
        Ok(())
    }

    fn is_homed(&self, axis: Axis) -> bool {
        self.homed.contains(&axis)
    }

    fn get_position(&self) -> RackPosition {
        self.pos
    }

    fn set_position(&mut self, position: RackPosition, homed_axes: &[Axis]) {
        self.calls.push(HostCall::SetPosition(position));
        self.selector_offset += self.pos.selector - position.selector;
        self.pos = position;
        self.homed.extend(homed_axes.iter().copied());
    }

    fn set_endstop_position(&mut self, axis: Axis, position: f64) {
        self.calls.push(HostCall::SetEndstop(axis, position));
        if axis == Axis::Selector {
            self.endstop_position = position;
        }
    }

    fn enable_motor(&mut self, axis: Axis) {
        self.calls.push(HostCall::EnableMotor(axis));
        self.motors_enabled.insert(axis);
    }

    fn disable_motor(&mut self, axis: Axis) {
        self.calls.push(HostCall::DisableMotor(axis));
        self.motors_enabled.remove(&axis);
        self.homed.remove(&axis);
    }

    fn motor_off(&mut self) {
        self.calls.push(HostCall::MotorOff);
        self.motors_enabled.clear();
        self.homed.clear();
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    fn source_position(&self, source: MotionSource) -> f64 {
        match source {
            MotionSource::Rack => self.pos.filament,
            MotionSource::Machine => self.extruder_pos,
        }
    }

    fn rebind_stepper(&mut self, stepper: StepperId, binding: StepperBinding) -> StepperBinding {
        self.calls.push(HostCall::Rebind(stepper, binding));
        self.bindings.insert(stepper, binding).unwrap_or_else(|| stepper.home_binding())
    }

    fn set_stepper_position(&mut self, stepper: StepperId, position: f64) {
        self.calls.push(HostCall::SetStepperPosition(stepper, position));
        self.stepper_positions.insert(stepper, position);
    }

    fn register_step_generator(&mut self, source: MotionSource, stepper: StepperId) {
        self.calls.push(HostCall::Register(source, stepper));
        self.generators.entry(source).or_default().push(stepper);
    }

    fn unregister_step_generator(&mut self, source: MotionSource, stepper: StepperId) {
        self.calls.push(HostCall::Unregister(source, stepper));
        if let Some(list) = self.generators.get_mut(&source) {
            list.retain(|s| *s != stepper);
        }
    }

    fn distance_per_revolution(&self, stepper: StepperId) -> f64 {
        self.dpr.get(&stepper).copied().unwrap_or(1.0)
    }

    fn set_distance_per_revolution(&mut self, stepper: StepperId, value: f64) {
        self.calls.push(HostCall::SetDpr(stepper, value));
        self.dpr.insert(stepper, value);
    }

    fn query_sensor(&mut self, sensor: Sensor) -> bool {
        self.filament_sensor_state(sensor)
    }

    fn set_servo_angle(&mut self, angle: f64, print_time: Option<f64>) {
        self.calls.push(HostCall::Servo(angle, print_time));
        self.servo_angle = Some(angle);
    }

    fn last_move_time(&mut self, _source: MotionSource) -> f64 {
        self.print_time
    }

    fn last_move_duration(&self, _source: MotionSource) -> f64 {
        self.last_duration
    }

    fn dwell(&mut self, source: MotionSource, seconds: f64) {
        self.calls.push(HostCall::Dwell(source, seconds));
        self.print_time += seconds;
    }

    fn set_heater_target(&mut self, temperature: f64, wait: bool) -> Result<(), HostError> {
        self.calls.push(HostCall::Heater(temperature, wait));
        self.heater_target = Some(temperature);
        Ok(())
    }
}

/// Pause/resume controller that records its state.
#[derive(Debug, Default)]
pub(crate) struct SimProcess {
    pub paused: bool,
    pub printing: bool,
    pub pause_count: usize,
    pub resume_count: usize,
}

impl SimProcess {
    pub fn printing() -> Self {
        Self { printing: true, ..Self::default() }
    }
}

impl ProcessControl for SimProcess {
    fn pause(&mut self) {
        self.paused = true;
        self.pause_count += 1;
    }

    fn resume(&mut self) {
        self.paused = false;
        self.resume_count += 1;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn is_printing(&self) -> bool {
        self.printing
    }
}

/// Variable store whose saves fail while `failing` is set.
#[derive(Debug, Default, Clone)]
pub(crate) struct FlakyStore {
    pub inner: MemoryStore,
    pub failing: Rc<Cell<bool>>,
}

impl VariableStore for FlakyStore {
    fn get_variable(&self, name: &str) -> Option<Value> {
        self.inner.get_variable(name)
    }

    fn save_variable(&mut self, name: &str, value: Value) -> StoreResult<()> {
        if self.failing.get() {
            return Err(std::io::Error::other("disk full").into());
        }
        self.inner.save_variable(name, value)
    }
}

/// Config used by most engine tests: four lanes, toolhead sensor fitted.
pub(crate) fn test_config() -> RackConfig {
    RackConfig {
        lane_count: 4,
        lane_spacing: 17.0,
        bowden_length: 1000.0,
        selector_unload_length: 30.0,
        extruder_load_length: 25.0,
        hotend_load_length: 19.0,
        has_toolhead_sensor: true,
        servo_down_angle: 0.0,
        servo_up_angle: 145.0,
        ..RackConfig::default()
    }
}

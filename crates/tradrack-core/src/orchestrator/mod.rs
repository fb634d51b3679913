//! Tool-change orchestration.
//!
//! [`ToolChangeOrchestrator`] is the single context object that owns all
//! engine state: lane table, tool map, sync manager, runout sensor, resume
//! stack and learned bowden lengths. Every operation is a method on it, and
//! all hardware access goes through the host traits it is generic over.
//!
//! Flows that can stop part-way (load, unload, runout recovery, selector
//! calibration) leave a [`ResumeAction`] on the resume stack, pause the host
//! process and return the error. [`ToolChangeOrchestrator::resume`] picks up
//! from there.

mod calibration;
mod failover;
mod load;
mod motion;
mod resume;
mod runout;
mod selector;
mod unload;

#[cfg(test)]
mod tests;

use tracing::{info, warn};
use tradrack_types::{
    Axis, Lane, LaneStatus, RackConfig, RackError, RackEvent, RackStatus, ResumeAction,
    SyncState, ValidationError,
};
use validator::Validate;

use crate::addons::ExtruderSyncSensor;
use crate::calibration::{BowdenHistory, BowdenLengthEstimate};
use crate::events::EventLog;
use crate::host::{MotionHost, ProcessControl};
use crate::lanes::{LanePositionTable, ToolLaneMap};
use crate::resume::ResumeStack;
use crate::runout::RunoutSensor;
use crate::storage::VariableStore;
use crate::sync::ExtruderSyncManager;

/// The filament-path orchestration engine.
#[derive(Debug)]
pub struct ToolChangeOrchestrator<H: MotionHost, S: VariableStore, P: ProcessControl> {
    host: H,
    store: S,
    process: P,
    config: RackConfig,
    lanes: Vec<Lane>,
    positions: LanePositionTable,
    tool_map: ToolLaneMap,
    sync: ExtruderSyncManager,
    runout: RunoutSensor,
    resume: ResumeStack,
    bowden_load: BowdenLengthEstimate,
    bowden_unload: BowdenLengthEstimate,
    history: Option<BowdenHistory>,
    events: EventLog,
    sync_sensor: Option<ExtruderSyncSensor>,
    /// Lane the selector is positioned at
    curr_lane: Option<usize>,
    /// Lane loaded into the toolhead
    active_lane: Option<usize>,
    /// Lane a pending load is heading for
    next_lane: Option<usize>,
    /// Lane to reload before a load is retried
    retry_lane: Option<usize>,
    servo_raised: Option<bool>,
    last_heater_target: Option<f64>,
    /// Persistence failure to report once the current command finishes
    persist_error: Option<RackError>,
}

impl<H: MotionHost, S: VariableStore, P: ProcessControl> ToolChangeOrchestrator<H, S, P> {
    /// Build the engine and load saved calibration and lane state.
    pub fn new(config: RackConfig, host: H, store: S, process: P) -> tradrack_types::Result<Self> {
        if let Err(errors) = config.validate() {
            return Err(tradrack_types::ConfigError::from_validation_errors(&errors).into());
        }

        let positions = LanePositionTable::from_config(&config);
        let lanes = positions
            .positions()
            .iter()
            .enumerate()
            .map(|(index, position)| Lane::new(index, *position))
            .collect();
        let window = config.bowden_length_samples;

        let mut engine = Self {
            host,
            store,
            process,
            lanes,
            tool_map: ToolLaneMap::identity(config.lane_count),
            positions,
            sync: ExtruderSyncManager::new(),
            runout: RunoutSensor::new(),
            resume: ResumeStack::new(),
            bowden_load: BowdenLengthEstimate::new(config.bowden_length, window),
            bowden_unload: BowdenLengthEstimate::new(config.bowden_length, window),
            history: config.bowden_log_dir.as_deref().map(BowdenHistory::new),
            events: EventLog::new(),
            sync_sensor: config.sync_sensor.map(ExtruderSyncSensor::new),
            curr_lane: None,
            active_lane: None,
            next_lane: None,
            retry_lane: None,
            servo_raised: None,
            last_heater_target: None,
            persist_error: None,
            config,
        };
        engine.restore_saved_state()?;

        info!(
            lanes = engine.config.lane_count,
            bowden_load = engine.bowden_load.length(),
            bowden_unload = engine.bowden_unload.length(),
            active_lane = ?engine.active_lane,
            "Trad Rack engine ready"
        );
        Ok(engine)
    }

    pub const fn config(&self) -> &RackConfig {
        &self.config
    }

    pub const fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn process(&self) -> &P {
        &self.process
    }

    pub fn process_mut(&mut self) -> &mut P {
        &mut self.process
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub const fn tool_map(&self) -> &ToolLaneMap {
        &self.tool_map
    }

    pub const fn curr_lane(&self) -> Option<usize> {
        self.curr_lane
    }

    pub const fn active_lane(&self) -> Option<usize> {
        self.active_lane
    }

    pub const fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    pub const fn resume_stack(&self) -> &ResumeStack {
        &self.resume
    }

    pub const fn bowden_load(&self) -> &BowdenLengthEstimate {
        &self.bowden_load
    }

    pub const fn bowden_unload(&self) -> &BowdenLengthEstimate {
        &self.bowden_unload
    }

    pub fn lane_positions(&self) -> &[f64] {
        self.positions.positions()
    }

    /// Take every event emitted since the last call.
    pub fn take_events(&mut self) -> Vec<RackEvent> {
        self.events.drain()
    }

    pub fn status(&self) -> RackStatus {
        let lanes = self
            .lanes
            .iter()
            .map(|lane| LaneStatus {
                lane: lane.index,
                tool: self.tool_map.tool_of(lane.index).unwrap_or(lane.index),
                position: lane.position,
                unloaded: lane.unloaded,
                dead: lane.dead,
            })
            .collect();

        RackStatus {
            curr_lane: self.curr_lane,
            active_lane: self.active_lane,
            next_lane: self.next_lane,
            retry_lane: self.retry_lane,
            tool_map: self.tool_map.as_slice().to_vec(),
            default_lanes: self.tool_map.default_lanes().to_vec(),
            selector_homed: self.host.is_homed(Axis::Selector),
            sync_state: self.sync.state(),
            bowden_load_length: self.bowden_load.length(),
            bowden_unload_length: self.bowden_unload.length(),
            bowden_load_calibrated: self.bowden_load.is_calibrated(),
            bowden_unload_calibrated: self.bowden_unload.is_calibrated(),
            lanes,
            resume_depth: self.resume.len(),
            pending_resume: self.resume.peek_kind(),
        }
    }

    // Tool map management

    pub fn assign_lane(&mut self, lane: usize, tool: usize) -> Result<(), RackError> {
        self.tool_map.assign(lane, tool)?;
        info!(lane, tool, "Lane assigned to tool");
        Ok(())
    }

    pub fn set_default_lane(&mut self, tool: usize, lane: Option<usize>) -> Result<(), RackError> {
        self.tool_map.set_default(tool, lane)?;
        Ok(())
    }

    pub fn reset_tool_map(&mut self) {
        self.tool_map.reset();
        info!("Tool map reset");
    }

    pub fn tool_groups(&self) -> Vec<(usize, Vec<usize>)> {
        self.tool_map.tool_groups()
    }

    // Shared plumbing

    /// Reject new commands while a previous one waits on the resume stack.
    fn ensure_idle(&self) -> Result<(), RackError> {
        if self.resume.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ResumePending { depth: self.resume.len() }.into())
        }
    }

    /// Leave hardware idle after a failure, push `entry` and pause.
    ///
    /// Validation and persistence errors are returned untouched. A shutdown
    /// only releases the drive motor.
    fn interrupt(&mut self, entry: ResumeAction, err: RackError) -> RackError {
        if err.is_validation() || matches!(err, RackError::Persistence { .. }) {
            return err;
        }
        if matches!(err, RackError::Shutdown { .. }) {
            self.host.disable_motor(Axis::FilamentDriver);
            return err;
        }

        self.make_safe();
        self.resume.push(entry);
        if matches!(err, RackError::SelectorNotHomed) {
            self.resume.push(ResumeAction::HomeSelector);
        }
        warn!(error = %err, depth = self.resume.len(), "Operation interrupted, waiting for resume");
        self.process.pause();
        err
    }

    /// Raise the servo and release any synced stepper.
    fn make_safe(&mut self) {
        self.raise_servo_quietly();
        if !self.sync.state().is_idle() {
            self.unsync();
        }
    }

    fn check_lane(&self, lane: usize) -> Result<(), RackError> {
        self.tool_map.check_lane(lane).map_err(RackError::from)
    }

    /// Report a persistence failure stashed during the last command.
    fn take_persist_error(&mut self) -> Result<(), RackError> {
        match self.persist_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

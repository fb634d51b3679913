//! Tool-change, calibration and validation errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::HostError;
use crate::models::LoadPhase;

/// Rejections raised before any hardware is touched.
///
/// A validation error never changes engine state, so the same command can be
/// retried immediately with corrected arguments.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum ValidationError {
    /// Lane index outside `0..lane_count`
    #[error("Invalid lane {lane}: expected 0..{lane_count}")]
    InvalidLane { lane: usize, lane_count: usize },

    /// Tool index outside `0..tool_count`
    #[error("Invalid tool {tool}: expected 0..{tool_count}")]
    InvalidTool { tool: usize, tool_count: usize },

    /// The tool exists but has no lane assigned
    #[error("No lane assigned to tool {tool}")]
    NoLaneForTool { tool: usize },

    /// A default lane was requested that does not belong to the tool
    #[error("Lane {lane} is not assigned to tool {tool}")]
    LaneNotAssigned { lane: usize, tool: usize },

    /// Filament is present in the selector when the action needs it empty
    #[error("Cannot {action} with filament in selector")]
    SelectorOccupied { action: String },

    /// Filament is absent from the selector when the action needs it present
    #[error("Cannot {action} without filament in selector")]
    SelectorEmpty { action: String },

    /// The selector position does not correspond to any lane
    #[error("Selector is not positioned at a lane")]
    SelectorNotAtLane,

    /// A previous operation is waiting on the resume stack
    #[error("{depth} pending resume action(s); resume before issuing new commands")]
    ResumePending { depth: usize },

    /// The multiplier can only be changed while the driver follows the extruder
    #[error("Filament driver is not synced to the extruder")]
    DriverNotSynced,

    /// Driver multipliers must be positive and finite
    #[error("Invalid filament driver multiplier {factor}")]
    InvalidMultiplier { factor: f64 },

    /// Measured calibration values cannot produce a usable lane table
    #[error("Calibration rejected: {message}")]
    CalibrationRejected { message: String },

    /// Nothing is waiting on the resume stack
    #[error("Nothing to resume")]
    NothingToResume,
}

/// Errors raised by the tool-change engine.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum RackError {
    /// Command rejected without side effects
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Selector must be homed before filament can be moved
    #[error("Selector must be homed before loading a lane")]
    SelectorNotHomed,

    /// A load step exhausted its travel or ran out of candidate lanes
    #[error("Failed to load {} during {phase}: {reason}", lane_label(*lane))]
    LoadFailed {
        /// Lane being loaded, if one had been chosen
        lane: Option<usize>,
        /// Step of the load sequence that failed
        phase: LoadPhase,
        /// Human-readable cause
        reason: String,
    },

    /// An unload step exhausted its travel
    #[error("Failed to unload {}: {reason}", lane_label(*lane))]
    UnloadFailed {
        /// Lane being unloaded, if known
        lane: Option<usize>,
        /// Human-readable cause
        reason: String,
    },

    /// A runout could not be recovered because no lane of the tool loads
    #[error("No replacement lane found after runout on lane {lane}")]
    RunoutUnrecoverable { lane: usize },

    /// Variable storage or calibration log I/O failed
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// The machine shut down mid-operation
    #[error("Machine shutdown: {message}")]
    Shutdown { message: String },

    /// Any other failure surfaced by the motion layer
    #[error("Host error: {0}")]
    Host(HostError),
}

fn lane_label(lane: Option<usize>) -> String {
    lane.map_or_else(|| "filament".to_string(), |l| format!("lane {l}"))
}

impl From<HostError> for RackError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Shutdown { message } => Self::Shutdown { message },
            other => Self::Host(other),
        }
    }
}

impl RackError {
    /// Check if this error was raised before any hardware was touched.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error leaves the engine paused waiting for a resume.
    pub const fn needs_resume(&self) -> bool {
        matches!(
            self,
            Self::SelectorNotHomed
                | Self::LoadFailed { .. }
                | Self::UnloadFailed { .. }
                | Self::RunoutUnrecoverable { .. }
        )
    }

    /// Shorthand for a load failure.
    pub fn load_failed(lane: Option<usize>, phase: LoadPhase, reason: impl Into<String>) -> Self {
        Self::LoadFailed { lane, phase, reason: reason.into() }
    }

    /// Shorthand for an unload failure.
    pub fn unload_failed(lane: Option<usize>, reason: impl Into<String>) -> Self {
        Self::UnloadFailed { lane, reason: reason.into() }
    }
}

//! Errors reported by the host motion layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures surfaced by the motion planner, homing primitive or kinematics.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum HostError {
    /// A sensor-terminated homing move used its full travel without the
    /// sensor reaching the requested state
    #[error("No sensor transition after full movement")]
    NoTrigger,

    /// The machine has shut down; no further motion is possible
    #[error("Machine shutdown: {message}")]
    Shutdown { message: String },

    /// The planner refused the move (unhomed axis, out of range, ...)
    #[error("Move rejected: {message}")]
    MoveRejected { message: String },
}

impl HostError {
    /// Check if this error is the homing primitive reporting an exhausted move.
    pub const fn is_no_trigger(&self) -> bool {
        matches!(self, Self::NoTrigger)
    }
}

//! Status snapshot reported to hosts and UIs.

use serde::{Deserialize, Serialize};

use super::{ResumeKind, SyncState};

/// Per-lane part of [`RackStatus`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaneStatus {
    pub lane: usize,
    pub tool: usize,
    pub position: f64,
    pub unloaded: bool,
    pub dead: bool,
}

/// Point-in-time view of the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RackStatus {
    /// Lane the selector sits at
    pub curr_lane: Option<usize>,
    /// Lane loaded into the toolhead
    pub active_lane: Option<usize>,
    /// Lane a pending load is heading for
    pub next_lane: Option<usize>,
    /// Lane that must be reloaded before resuming
    pub retry_lane: Option<usize>,
    /// Tool assigned to each lane
    pub tool_map: Vec<usize>,
    /// Default lane of each tool
    pub default_lanes: Vec<Option<usize>>,
    pub selector_homed: bool,
    pub sync_state: SyncState,
    pub bowden_load_length: f64,
    pub bowden_unload_length: f64,
    pub bowden_load_calibrated: bool,
    pub bowden_unload_calibrated: bool,
    pub lanes: Vec<LaneStatus>,
    pub resume_depth: usize,
    /// Kind of the action on top of the resume stack
    pub pending_resume: Option<ResumeKind>,
}

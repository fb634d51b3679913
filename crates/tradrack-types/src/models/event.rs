//! Notifications emitted by the engine.

use serde::{Deserialize, Serialize};

/// Events consumed by add-ons and embedding hosts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RackEvent {
    LoadStarted { lane: usize },
    LoadComplete { lane: usize },
    UnloadStarted { lane: usize },
    UnloadComplete { lane: usize },
    /// The filament driver now follows the extruder
    SyncedToExtruder,
    /// The filament driver is about to stop following the extruder
    UnsyncingFromExtruder,
    RunoutDetected { lane: usize },
    ActiveLaneForced { lane: usize },
    ActiveLaneReset,
}

impl RackEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LoadStarted { .. } => "load_started",
            Self::LoadComplete { .. } => "load_complete",
            Self::UnloadStarted { .. } => "unload_started",
            Self::UnloadComplete { .. } => "unload_complete",
            Self::SyncedToExtruder => "synced_to_extruder",
            Self::UnsyncingFromExtruder => "unsyncing_from_extruder",
            Self::RunoutDetected { .. } => "runout_detected",
            Self::ActiveLaneForced { .. } => "active_lane_forced",
            Self::ActiveLaneReset => "active_lane_reset",
        }
    }
}

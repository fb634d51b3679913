//! Lane model.

use serde::{Deserialize, Serialize};

/// One physical filament path selectable by the selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lane {
    pub index: usize,
    /// Absolute selector position of this lane
    pub position: f64,
    /// Buffer segment was refilled by an unload; pull at buffer speed
    #[serde(default)]
    pub unloaded: bool,
    /// Last load attempt from this lane failed
    #[serde(default)]
    pub dead: bool,
}

impl Lane {
    pub const fn new(index: usize, position: f64) -> Self {
        Self { index, position, unloaded: false, dead: false }
    }
}

/// What a load request asks for: a specific lane, or any lane of a tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "index", rename_all = "snake_case")]
pub enum LoadTarget {
    Lane(usize),
    Tool(usize),
}

impl LoadTarget {
    /// Whether a failed lane may be replaced by failover.
    pub const fn allows_failover(&self) -> bool {
        matches!(self, Self::Tool(_))
    }
}

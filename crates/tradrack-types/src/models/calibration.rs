//! Persisted calibration records.

use serde::{Deserialize, Serialize};

/// Saved state of a bowden length estimator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BowdenLengthStats {
    /// Mean at the time of saving
    pub new_set_length: f64,
    /// Samples the mean was computed from
    pub sample_count: usize,
}

/// Which bowden estimators an operation applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BowdenDirection {
    Load,
    Unload,
    Both,
}

impl BowdenDirection {
    pub const fn includes_load(&self) -> bool {
        matches!(self, Self::Load | Self::Both)
    }

    pub const fn includes_unload(&self) -> bool {
        matches!(self, Self::Unload | Self::Both)
    }
}

/// Result of a selector calibration.
///
/// `lane_count` and `config_spacing` record the configuration the result was
/// derived under; a saved calibration is ignored once either changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectorCalibration {
    /// Selector endstop position in lane-table coordinates
    pub position_endstop: f64,
    /// Measured lane spacing
    pub spacing: f64,
    pub lane_positions: Vec<f64>,
    pub lane_count: usize,
    pub config_spacing: f64,
}

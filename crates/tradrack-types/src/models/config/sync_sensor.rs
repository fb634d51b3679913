//! Extruder sync sensor add-on configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Multipliers applied to the filament driver while it follows the extruder.
///
/// The sensor sits in a short buffer between the rack and the toolhead. When
/// the buffer compresses in the direction of travel the driver runs slightly
/// faster (`multiplier_high`), otherwise slightly slower (`multiplier_low`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Validate)]
pub struct SyncSensorConfig {
    /// Driver speed factor while the buffer lags behind the extruder
    #[validate(range(min = 1.0))]
    #[serde(default = "default_multiplier_high")]
    pub multiplier_high: f64,
    /// Driver speed factor while the buffer leads the extruder
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_multiplier_low")]
    pub multiplier_low: f64,
}

impl Default for SyncSensorConfig {
    fn default() -> Self {
        Self { multiplier_high: default_multiplier_high(), multiplier_low: default_multiplier_low() }
    }
}

pub const fn default_multiplier_high() -> f64 {
    1.05
}

pub const fn default_multiplier_low() -> f64 {
    0.95
}

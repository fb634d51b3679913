//! Selector position of every lane.

use tradrack_types::{RackConfig, SelectorCalibration, ValidationError};

/// Lane positions derived from a spacing plus per-lane mods and offsets.
///
/// Lane `i` sits at `sum(mods[0..=i]) + i * spacing + offsets[i]`: a mod
/// shifts its lane and every later lane, an offset shifts only its own lane.
#[derive(Debug, Clone, PartialEq)]
pub struct LanePositionTable {
    config_spacing: f64,
    spacing: f64,
    mods: Vec<f64>,
    offsets: Vec<f64>,
    positions: Vec<f64>,
}

impl LanePositionTable {
    pub fn from_config(config: &RackConfig) -> Self {
        let mods = (0..config.lane_count).map(|i| config.lane_spacing_mod(i)).collect();
        let offsets = (0..config.lane_count).map(|i| config.lane_offset(i)).collect();
        let mut table = Self {
            config_spacing: config.lane_spacing,
            spacing: config.lane_spacing,
            mods,
            offsets,
            positions: Vec::new(),
        };
        table.positions = table.compute(table.spacing);
        table
    }

    fn compute(&self, spacing: f64) -> Vec<f64> {
        let mut curr = 0.0;
        let mut positions = Vec::with_capacity(self.mods.len());
        for (spacing_mod, offset) in self.mods.iter().zip(&self.offsets) {
            curr += spacing_mod;
            positions.push(curr + offset);
            curr += spacing;
        }
        positions
    }

    pub fn lane_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn position(&self, lane: usize) -> Option<f64> {
        self.positions.get(lane).copied()
    }

    pub const fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Solve for the endstop position and true spacing.
    ///
    /// `first_distance` and `last_distance` are the measured distances from
    /// the selector endstop to lane 0 and to the last lane. The table itself
    /// is left untouched; pass the result to [`Self::apply`].
    pub fn calibrate(
        &self,
        first_distance: f64,
        last_distance: f64,
    ) -> Result<SelectorCalibration, ValidationError> {
        let n = self.positions.len();
        if n < 2 {
            return Err(rejected("at least two lanes are required"));
        }
        if !first_distance.is_finite() || !last_distance.is_finite() {
            return Err(rejected("measured distances must be finite"));
        }

        let later_mods: f64 = self.mods[1..n].iter().sum();
        let spacing = ((last_distance - first_distance) - later_mods - self.offsets[n - 1]
            + self.offsets[0])
            / (n - 1) as f64;
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(rejected(&format!(
                "derived spacing {spacing:.3} is not positive (first {first_distance:.3}, last {last_distance:.3})"
            )));
        }

        let lane_positions = self.compute(spacing);
        let position_endstop = lane_positions[0] - first_distance;

        Ok(SelectorCalibration {
            position_endstop,
            spacing,
            lane_positions,
            lane_count: n,
            config_spacing: self.config_spacing,
        })
    }

    pub fn apply(&mut self, calibration: &SelectorCalibration) {
        self.spacing = calibration.spacing;
        self.positions = self.compute(calibration.spacing);
    }

    /// Whether a saved calibration was derived under the current lane layout.
    pub fn accepts(&self, calibration: &SelectorCalibration) -> bool {
        calibration.lane_count == self.positions.len()
            && (calibration.config_spacing - self.config_spacing).abs() < f64::EPSILON
    }
}

fn rejected(message: &str) -> ValidationError {
    ValidationError::CalibrationRejected { message: message.to_string() }
}

//! Rack hardware and tool-change configuration.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::SyncSensorConfig;

/// Full rack configuration.
///
/// Lengths are in millimetres, speeds in mm/s. Fields left as `None` are
/// derived from other fields through the accessor of the same name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
#[validate(schema(function = "validate_lane_tables"))]
#[allow(
    clippy::struct_excessive_bools,
    reason = "Configuration struct - bools are intentional feature flags"
)]
pub struct RackConfig {
    /// Number of lanes (and tools)
    #[validate(range(min = 2_usize))]
    pub lane_count: usize,
    /// Nominal distance between neighbouring lanes
    #[validate(range(exclusive_min = 0.0))]
    pub lane_spacing: f64,
    /// Extra spacing added before lane `i`, accumulated into every later lane
    #[serde(default)]
    pub lane_spacing_mods: Vec<f64>,
    /// Fixed offset applied to lane `i` only
    #[serde(default)]
    pub lane_offsets: Vec<f64>,

    /// Selector travel speed between lanes
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_selector_max_velocity")]
    pub selector_max_velocity: f64,
    /// Pull speed for a lane fed straight from its spool
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_spool_pull_speed")]
    pub spool_pull_speed: f64,
    /// Pull speed for a lane whose buffer was refilled by an unload
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default)]
    pub buffer_pull_speed: Option<f64>,

    /// Configured bowden tube length; also the calibration fingerprint
    #[validate(range(exclusive_min = 0.0))]
    pub bowden_length: f64,
    /// Window size of the bowden length moving average
    #[validate(range(min = 1_usize))]
    #[serde(default = "default_bowden_length_samples")]
    pub bowden_length_samples: usize,
    /// Distance filament is parked behind the selector sensor
    #[validate(range(exclusive_min = 0.0))]
    pub selector_unload_length: f64,
    /// Extra retraction when ejecting a runout lane
    #[validate(range(min = 0.0))]
    #[serde(default = "default_eject_length")]
    pub eject_length: f64,
    /// Distance from the toolhead sensor into the extruder gears
    #[validate(range(exclusive_min = 0.0))]
    pub extruder_load_length: f64,
    /// Distance from the extruder gears into the hotend
    #[validate(range(min = 0.0))]
    pub hotend_load_length: f64,
    /// Retraction that clears the extruder gears on unload
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default)]
    pub toolhead_unload_length: Option<f64>,

    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_selector_sense_speed")]
    pub selector_sense_speed: f64,
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_selector_unload_speed")]
    pub selector_unload_speed: f64,
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default)]
    pub toolhead_sense_speed: Option<f64>,
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_extruder_load_speed")]
    pub extruder_load_speed: f64,
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_hotend_load_speed")]
    pub hotend_load_speed: f64,
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default)]
    pub toolhead_unload_speed: Option<f64>,

    /// A filament sensor is fitted at the toolhead
    #[serde(default)]
    pub has_toolhead_sensor: bool,
    #[serde(default = "default_true")]
    pub load_with_toolhead_sensor: bool,
    #[serde(default = "default_true")]
    pub unload_with_toolhead_sensor: bool,
    /// Back-off applied after a sensor triggers earlier than expected
    #[validate(range(min = 0.0))]
    #[serde(default = "default_fil_homing_retract_dist")]
    pub fil_homing_retract_dist: f64,
    /// Distance past the toolhead sensor the learned load length aims for
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default)]
    pub target_toolhead_homing_dist: Option<f64>,
    /// Distance past the selector sensor the learned unload length aims for
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_target_selector_homing_dist")]
    pub target_selector_homing_dist: f64,
    /// Maximum travel of every filament homing move
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_sense_travel")]
    pub sense_travel: f64,
    /// Maximum selector travel while measuring calibration distances
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default)]
    pub selector_calibration_travel: Option<f64>,

    pub servo_down_angle: f64,
    pub servo_up_angle: f64,
    #[validate(range(exclusive_min = 0.0))]
    #[serde(default = "default_servo_wait_ms")]
    pub servo_wait_ms: f64,

    /// Keep the filament driver following the extruder after a load
    #[serde(default)]
    pub sync_to_extruder: bool,
    /// Persist the active lane across restarts
    #[serde(default = "default_true")]
    pub save_active_lane: bool,
    /// Directory for the bowden length CSV history; disabled when unset
    #[serde(default)]
    pub bowden_log_dir: Option<String>,

    /// Optional extruder sync sensor add-on
    #[serde(default)]
    #[validate(nested)]
    pub sync_sensor: Option<SyncSensorConfig>,
}

impl Default for RackConfig {
    fn default() -> Self {
        Self {
            lane_count: 5,
            lane_spacing: 17.0,
            lane_spacing_mods: Vec::new(),
            lane_offsets: Vec::new(),
            selector_max_velocity: default_selector_max_velocity(),
            spool_pull_speed: default_spool_pull_speed(),
            buffer_pull_speed: None,
            bowden_length: 1000.0,
            bowden_length_samples: default_bowden_length_samples(),
            selector_unload_length: 30.0,
            eject_length: default_eject_length(),
            extruder_load_length: 25.0,
            hotend_load_length: 19.0,
            toolhead_unload_length: None,
            selector_sense_speed: default_selector_sense_speed(),
            selector_unload_speed: default_selector_unload_speed(),
            toolhead_sense_speed: None,
            extruder_load_speed: default_extruder_load_speed(),
            hotend_load_speed: default_hotend_load_speed(),
            toolhead_unload_speed: None,
            has_toolhead_sensor: true,
            load_with_toolhead_sensor: true,
            unload_with_toolhead_sensor: true,
            fil_homing_retract_dist: default_fil_homing_retract_dist(),
            target_toolhead_homing_dist: None,
            target_selector_homing_dist: default_target_selector_homing_dist(),
            sense_travel: default_sense_travel(),
            selector_calibration_travel: None,
            servo_down_angle: 0.0,
            servo_up_angle: 145.0,
            servo_wait_ms: default_servo_wait_ms(),
            sync_to_extruder: false,
            save_active_lane: true,
            bowden_log_dir: None,
            sync_sensor: None,
        }
    }
}

impl RackConfig {
    /// Number of tools; every lane starts out as its own tool.
    pub const fn tool_count(&self) -> usize {
        self.lane_count
    }

    pub fn buffer_pull_speed(&self) -> f64 {
        self.buffer_pull_speed.unwrap_or(self.spool_pull_speed)
    }

    pub fn toolhead_unload_length(&self) -> f64 {
        self.toolhead_unload_length
            .unwrap_or(self.extruder_load_length + self.hotend_load_length)
    }

    pub fn toolhead_sense_speed(&self) -> f64 {
        self.toolhead_sense_speed.unwrap_or(self.selector_sense_speed)
    }

    pub fn toolhead_unload_speed(&self) -> f64 {
        self.toolhead_unload_speed.unwrap_or(self.extruder_load_speed)
    }

    pub fn target_toolhead_homing_dist(&self) -> f64 {
        self.target_toolhead_homing_dist
            .unwrap_or_else(|| self.toolhead_unload_length().max(10.0))
    }

    /// Servo settle time in seconds.
    pub fn servo_wait(&self) -> f64 {
        self.servo_wait_ms / 1000.0
    }

    /// Whether load moves should terminate on the toolhead sensor.
    pub const fn loads_with_toolhead_sensor(&self) -> bool {
        self.has_toolhead_sensor && self.load_with_toolhead_sensor
    }

    /// Whether unload moves should terminate on the toolhead sensor.
    pub const fn unloads_with_toolhead_sensor(&self) -> bool {
        self.has_toolhead_sensor && self.unload_with_toolhead_sensor
    }

    /// Spacing mod for lane `lane`, zero when not configured.
    pub fn lane_spacing_mod(&self, lane: usize) -> f64 {
        self.lane_spacing_mods.get(lane).copied().unwrap_or(0.0)
    }

    /// Offset for lane `lane`, zero when not configured.
    pub fn lane_offset(&self, lane: usize) -> f64 {
        self.lane_offsets.get(lane).copied().unwrap_or(0.0)
    }

    /// Selector travel budget for calibration measurements.
    pub fn selector_calibration_travel(&self) -> f64 {
        self.selector_calibration_travel.unwrap_or_else(|| {
            let mods: f64 = self.lane_spacing_mods.iter().map(|m| m.abs()).sum();
            let offsets = self.lane_offsets.iter().fold(0.0_f64, |acc, o| acc.max(o.abs()));
            let span = (self.lane_count - 1) as f64 * self.lane_spacing + mods + offsets;
            1.5 * (span + self.lane_spacing)
        })
    }
}

fn validate_lane_tables(config: &RackConfig) -> Result<(), ValidationError> {
    if config.lane_spacing_mods.len() > config.lane_count {
        return Err(ValidationError::new("lane_spacing_mods")
            .with_message("more spacing mods than lanes".into()));
    }
    if config.lane_offsets.len() > config.lane_count {
        return Err(ValidationError::new("lane_offsets")
            .with_message("more lane offsets than lanes".into()));
    }
    if let Some(sensor) = &config.sync_sensor {
        if sensor.multiplier_low > sensor.multiplier_high {
            return Err(ValidationError::new("sync_sensor")
                .with_message("multiplier_low exceeds multiplier_high".into()));
        }
    }
    Ok(())
}

pub const fn default_selector_max_velocity() -> f64 {
    200.0
}

pub const fn default_spool_pull_speed() -> f64 {
    100.0
}

pub const fn default_bowden_length_samples() -> usize {
    10
}

pub const fn default_eject_length() -> f64 {
    30.0
}

pub const fn default_selector_sense_speed() -> f64 {
    40.0
}

pub const fn default_selector_unload_speed() -> f64 {
    60.0
}

pub const fn default_extruder_load_speed() -> f64 {
    60.0
}

pub const fn default_hotend_load_speed() -> f64 {
    7.0
}

pub const fn default_fil_homing_retract_dist() -> f64 {
    20.0
}

pub const fn default_target_selector_homing_dist() -> f64 {
    10.0
}

pub const fn default_sense_travel() -> f64 {
    600.0
}

pub const fn default_servo_wait_ms() -> f64 {
    500.0
}

const fn default_true() -> bool {
    true
}

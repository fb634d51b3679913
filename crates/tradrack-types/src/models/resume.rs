//! Resume actions pushed when an operation stops part-way.
//!
//! Every failure that leaves hardware waiting on a person pushes one or more
//! [`ResumeAction`] values onto the engine's LIFO stack. A resume command pops
//! and dispatches them in order. They are plain data so a pending stack can be
//! inspected, logged or serialized.

use serde::{Deserialize, Serialize};

use super::LoadTarget;

/// Steps of the toolhead load sequence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Validate,
    CheckHomed,
    UnloadCurrent,
    LoadSelector,
    BowdenTransit,
    SyncExtruderToDriver,
    HomeToToolheadSensor,
    FinishExtruderLoad,
    RestoreSync,
    Finalize,
}

impl std::fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validate => "validate",
            Self::CheckHomed => "check_homed",
            Self::UnloadCurrent => "unload_current",
            Self::LoadSelector => "load_selector",
            Self::BowdenTransit => "bowden_transit",
            Self::SyncExtruderToDriver => "sync_extruder_to_driver",
            Self::HomeToToolheadSensor => "home_to_toolhead_sensor",
            Self::FinishExtruderLoad => "finish_extruder_load",
            Self::RestoreSync => "restore_sync",
            Self::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Steps of runout recovery.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RunoutPhase {
    Detected,
    Unloading,
    FindingReplacement,
    LoadingReplacement,
}

/// Which reference lane the selector calibration is measuring next.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStage {
    FirstLane,
    LastLane,
}

/// Parameters of a toolhead load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadRequest {
    pub target: LoadTarget,
    /// Overrides the learned bowden load length
    #[serde(default)]
    pub bowden_length: Option<f64>,
    #[serde(default)]
    pub extruder_load_length: Option<f64>,
    #[serde(default)]
    pub hotend_load_length: Option<f64>,
    /// Hotend temperature to set before loading
    #[serde(default)]
    pub heater_target: Option<f64>,
}

impl LoadRequest {
    pub const fn new(target: LoadTarget) -> Self {
        Self {
            target,
            bowden_length: None,
            extruder_load_length: None,
            hotend_load_length: None,
            heater_target: None,
        }
    }

    pub const fn lane(lane: usize) -> Self {
        Self::new(LoadTarget::Lane(lane))
    }

    pub const fn tool(tool: usize) -> Self {
        Self::new(LoadTarget::Tool(tool))
    }

    #[must_use]
    pub const fn with_bowden_length(mut self, length: f64) -> Self {
        self.bowden_length = Some(length);
        self
    }

    #[must_use]
    pub const fn with_extruder_load_length(mut self, length: f64) -> Self {
        self.extruder_load_length = Some(length);
        self
    }

    #[must_use]
    pub const fn with_hotend_load_length(mut self, length: f64) -> Self {
        self.hotend_load_length = Some(length);
        self
    }

    #[must_use]
    pub const fn with_heater_target(mut self, temp: f64) -> Self {
        self.heater_target = Some(temp);
        self
    }

    /// Same request pinned to the lane that was actually chosen.
    #[must_use]
    pub fn pinned_to(&self, lane: usize) -> Self {
        Self { target: LoadTarget::Lane(lane), ..self.clone() }
    }
}

/// A pending recovery step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum ResumeAction {
    /// Retry a toolhead load
    LoadToolhead(LoadRequest),
    /// Feed a lane back into the selector after the user cleared it
    ReloadLane { lane: usize },
    /// Home the selector before retrying
    HomeSelector,
    /// Retry a toolhead unload
    UnloadToolhead,
    /// Continue runout recovery at the step that failed
    RunoutReplace {
        failed_lane: usize,
        phase: RunoutPhase,
        #[serde(default)]
        replacement: Option<usize>,
    },
    /// Ask again whether the selector state is consistent
    LocateSelector,
    /// Measure the next reference lane of a selector calibration
    CalibrateSelector {
        stage: CalibrationStage,
        #[serde(default)]
        first_lane_distance: Option<f64>,
    },
}

/// Discriminant of [`ResumeAction`] without its parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResumeKind {
    LoadToolhead,
    ReloadLane,
    HomeSelector,
    UnloadToolhead,
    RunoutReplace,
    LocateSelector,
    CalibrateSelector,
}

impl ResumeAction {
    pub const fn kind(&self) -> ResumeKind {
        match self {
            Self::LoadToolhead(_) => ResumeKind::LoadToolhead,
            Self::ReloadLane { .. } => ResumeKind::ReloadLane,
            Self::HomeSelector => ResumeKind::HomeSelector,
            Self::UnloadToolhead => ResumeKind::UnloadToolhead,
            Self::RunoutReplace { .. } => ResumeKind::RunoutReplace,
            Self::LocateSelector => ResumeKind::LocateSelector,
            Self::CalibrateSelector { .. } => ResumeKind::CalibrateSelector,
        }
    }
}

//! Stepper ownership between the rack and the machine extruder.

use serde::{Deserialize, Serialize};

/// Which stepper pairing is currently reassigned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Both steppers run on their own motion sources
    #[default]
    Unsynced,
    /// The filament driver follows the machine's extruder motion
    DriverDrivesExtruder,
    /// The extruder stepper follows the rack's filament axis
    ExtruderDrivesDriver,
}

impl SyncState {
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Unsynced)
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsynced => write!(f, "unsynced"),
            Self::DriverDrivesExtruder => write!(f, "driver_drives_extruder"),
            Self::ExtruderDrivesDriver => write!(f, "extruder_drives_driver"),
        }
    }
}

/// A motion queue that generates steps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MotionSource {
    /// The rack's own selector/filament motion queue
    Rack,
    /// The machine's toolhead motion queue, which carries the extruder
    Machine,
}

/// Physical steppers whose binding can be reassigned.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepperId {
    FilamentDriver,
    Extruder,
}

/// Kinematic solver that converts a motion source's coordinates to steps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum KinematicSolver {
    RackSelectorAxis,
    RackFilamentAxis,
    Extruder,
}

/// A stepper's current motion source and solver.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct StepperBinding {
    pub source: MotionSource,
    pub solver: KinematicSolver,
}

impl StepperBinding {
    pub const fn new(source: MotionSource, solver: KinematicSolver) -> Self {
        Self { source, solver }
    }

    /// Binding that makes a stepper follow the rack's filament axis.
    pub const fn rack_filament() -> Self {
        Self::new(MotionSource::Rack, KinematicSolver::RackFilamentAxis)
    }

    /// Binding that makes a stepper follow the machine's extruder axis.
    pub const fn machine_extruder() -> Self {
        Self::new(MotionSource::Machine, KinematicSolver::Extruder)
    }
}

impl StepperId {
    /// Binding the stepper has when nothing is synced.
    pub const fn home_binding(&self) -> StepperBinding {
        match self {
            Self::FilamentDriver => StepperBinding::rack_filament(),
            Self::Extruder => StepperBinding::machine_extruder(),
        }
    }
}

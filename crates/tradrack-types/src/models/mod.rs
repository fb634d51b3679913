//! Core domain models for the Trad Rack engine.
//!
//! This module contains the data structures shared between the engine, its
//! host collaborators and anything that reports on rack state.

mod calibration;
mod config;
mod event;
mod lane;
mod motion;
mod resume;
mod status;
mod sync;

// Re-export all models
pub use calibration::{BowdenDirection, BowdenLengthStats, SelectorCalibration};
pub use config::{RackConfig, SyncSensorConfig};
pub use event::RackEvent;
pub use lane::{Lane, LoadTarget};
pub use motion::{Axis, HomingRequest, RackPosition, Sensor};
pub use resume::{CalibrationStage, LoadPhase, LoadRequest, ResumeAction, ResumeKind, RunoutPhase};
pub use status::{LaneStatus, RackStatus};
pub use sync::{KinematicSolver, MotionSource, StepperBinding, StepperId, SyncState};

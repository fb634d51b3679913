//! # Trad Rack Types
//!
//! Configuration, domain models, and error definitions for the Trad Rack
//! multi-lane filament changer.
//!
//! This crate provides the foundational type system for the engine:
//!
//! - **`error`** - Typed error hierarchy for validation, host, rack and configuration failures
//! - **`models`** - Domain models (lanes, sync state, resume actions, status, events, config)
//!
//! ## Architecture Role
//!
//! `tradrack-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!     tradrack-types (this crate)
//!            │
//!            ▼
//!     tradrack-core (orchestrator, host traits, storage)
//!            │
//!            ▼
//!     embedding host (motion planner, macros, UI)
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for persistence and status reporting
//! - **Clone** so snapshots can be handed out freely
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

// Re-export error types for convenience
pub use error::{ConfigError, HostError, RackError, Result, TypedError, ValidationError};

// Re-export core model types
pub use models::{
    Axis, BowdenDirection, BowdenLengthStats, CalibrationStage, HomingRequest, KinematicSolver,
    Lane, LaneStatus, LoadPhase, LoadRequest, LoadTarget, MotionSource, RackConfig, RackEvent,
    RackPosition, RackStatus, ResumeAction, ResumeKind, RunoutPhase, SelectorCalibration, Sensor,
    StepperBinding, StepperId, SyncSensorConfig, SyncState,
};

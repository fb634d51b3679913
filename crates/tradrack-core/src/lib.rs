//! # Trad Rack Core
//!
//! Filament-path orchestration engine for the Trad Rack multi-lane filament
//! changer.
//!
//! ## Architecture
//!
//! ```text
//! tradrack-core/src/
//! ├── host.rs           # MotionHost / ProcessControl collaborator traits
//! ├── calibration/      # bowden length moving average + CSV history
//! ├── lanes/            # lane position table, tool/lane map
//! ├── sync/             # extruder <-> filament driver stepper ownership
//! ├── runout.rs         # edge-triggered runout sensor
//! ├── resume.rs         # LIFO resume stack
//! ├── orchestrator/     # load, unload, failover, runout, calibration flows
//! ├── storage/          # persisted variables (memory, JSON file)
//! ├── addons/           # extruder sync sensor, spool id map
//! ├── config.rs         # config file loading + validation
//! └── logger.rs         # tracing subscriber setup
//! ```
//!
//! The engine never owns hardware. Every move, homing probe, sensor read and
//! stepper rebinding goes through [`host::MotionHost`], so the whole tool-change
//! state machine runs deterministically against a simulated host in tests.

#![allow(
    clippy::module_name_repetitions,
    reason = "Type names mirror their modules for readability at call sites"
)]
#![allow(
    clippy::derive_partial_eq_without_eq,
    reason = "Some types intentionally don't implement Eq"
)]
#![allow(
    clippy::redundant_else,
    reason = "Explicit else blocks improve readability in complex control flow"
)]
// Test-only lints: allow panic!, println!, etc. in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::assertions_on_result_states
    )
)]

pub mod addons;
pub mod calibration;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod lanes;
pub mod logger;
pub mod orchestrator;
pub mod resume;
pub mod runout;
pub mod storage;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use error::StoreError;
pub use host::{MotionHost, ProcessControl};
pub use orchestrator::ToolChangeOrchestrator;
pub use storage::{JsonFileStore, MemoryStore, VariableStore};
pub use tradrack_types::{RackConfig, RackError, RackEvent, RackStatus};

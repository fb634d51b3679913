//! Binding recorded when a stepper is rebound.

use tradrack_types::{StepperBinding, StepperId};

/// What to restore on unsync.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SyncSnapshot {
    pub stepper: StepperId,
    /// Binding before the sync
    pub binding: StepperBinding,
    /// Distance per revolution before the sync
    pub distance_per_revolution: f64,
}

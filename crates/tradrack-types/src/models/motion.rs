//! Motion primitives shared with the host.

use serde::{Deserialize, Serialize};

/// Logical axes of the rack's own motion source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Selector,
    FilamentDriver,
}

/// Binary sensors the engine reads or homes against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sensor {
    /// Filament presence at the selector
    SelectorFilament,
    /// Filament presence just above the extruder
    ToolheadFilament,
    /// Selector axis endstop
    SelectorEndstop,
}

/// Two-axis coordinate of the rack's motion source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct RackPosition {
    pub selector: f64,
    pub filament: f64,
}

impl RackPosition {
    pub const fn new(selector: f64, filament: f64) -> Self {
        Self { selector, filament }
    }

    #[must_use]
    pub const fn with_selector(self, selector: f64) -> Self {
        Self { selector, ..self }
    }

    #[must_use]
    pub const fn with_filament(self, filament: f64) -> Self {
        Self { filament, ..self }
    }

    /// Shift the filament axis by `delta`.
    #[must_use]
    pub fn advance(self, delta: f64) -> Self {
        Self { filament: self.filament + delta, ..self }
    }
}

/// A sensor-terminated move.
///
/// The host moves toward `target` and stops as soon as any of `sensors`
/// reaches the requested state (`triggered`), returning the position at
/// which it stopped. Exhausting the move without a transition is
/// `HostError::NoTrigger`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HomingRequest {
    pub sensors: Vec<Sensor>,
    pub target: RackPosition,
    pub velocity: f64,
    /// Wait for the sensor to trigger (true) or clear (false)
    pub triggered: bool,
    /// Report the exact trigger position rather than the stop position
    pub probe_position: bool,
}

impl HomingRequest {
    pub fn new(sensor: Sensor, target: RackPosition, velocity: f64) -> Self {
        Self { sensors: vec![sensor], target, velocity, triggered: true, probe_position: false }
    }

    /// Terminate when the sensor clears instead of when it triggers.
    #[must_use]
    pub const fn until_cleared(mut self) -> Self {
        self.triggered = false;
        self
    }

    #[must_use]
    pub const fn probing(mut self) -> Self {
        self.probe_position = true;
        self
    }
}

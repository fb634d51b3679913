//! Buffer sensor that trims the filament driver while it follows the extruder.
//!
//! A binary sensor on a short sprung buffer between the rack and the toolhead
//! reports whether the buffer is compressed. Combined with the extruder's
//! direction of travel it tells whether the driver is lagging or leading, and
//! the driver multiplier is switched between `multiplier_high` and
//! `multiplier_low` accordingly.

use tracing::{debug, trace};
use tradrack_types::{RackEvent, SyncSensorConfig};

/// How often the embedding host should sample the extruder direction (s).
pub const DIRECTION_UPDATE_INTERVAL: f64 = 0.1;

/// Time between the two extruder positions compared for direction (s).
pub const POSITION_TIME_DIFF: f64 = 0.3;

/// Multiplier applied when the add-on is released.
const NEUTRAL_MULTIPLIER: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct ExtruderSyncSensor {
    config: SyncSensorConfig,
    enabled: bool,
    last_state: bool,
    moving_forward: bool,
}

impl ExtruderSyncSensor {
    pub fn new(config: SyncSensorConfig) -> Self {
        Self { config, enabled: false, last_state: false, moving_forward: true }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub const fn last_state(&self) -> bool {
        self.last_state
    }

    /// React to a rack event; returns the multiplier to apply, if any.
    ///
    /// `driver_synced` must reflect the sync state at the time of the event.
    pub fn handle_event(&mut self, event: RackEvent, driver_synced: bool) -> Option<f64> {
        match event {
            RackEvent::SyncedToExtruder if !self.enabled && driver_synced => {
                self.enabled = true;
                debug!("Extruder sync sensor enabled");
                Some(self.multiplier())
            },
            RackEvent::UnsyncingFromExtruder if self.enabled && driver_synced => {
                self.enabled = false;
                debug!("Extruder sync sensor disabled");
                Some(NEUTRAL_MULTIPLIER)
            },
            _ => None,
        }
    }

    /// Record a sensor edge; returns the multiplier to apply while enabled.
    pub fn handle_sensor(&mut self, compressed: bool) -> Option<f64> {
        self.last_state = compressed;
        self.enabled.then(|| self.multiplier())
    }

    /// Compare two extruder positions taken `POSITION_TIME_DIFF` apart.
    ///
    /// Returns a new multiplier only when the direction changed while enabled.
    pub fn update_direction(&mut self, current_position: f64, past_position: f64) -> Option<f64> {
        let previous = self.moving_forward;
        self.moving_forward = current_position >= past_position;
        if self.moving_forward == previous {
            return None;
        }
        trace!(forward = self.moving_forward, "Extruder direction changed");
        self.enabled.then(|| self.multiplier())
    }

    fn multiplier(&self) -> f64 {
        // compressed while moving forward, or expanded while moving backward
        if self.last_state == self.moving_forward {
            self.config.multiplier_high
        } else {
            self.config.multiplier_low
        }
    }
}

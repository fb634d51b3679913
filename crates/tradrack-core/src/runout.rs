//! Edge-triggered runout detection on the selector filament sensor.

use tracing::debug;

/// Raises a runout once per arming, on a falling edge while printing.
#[derive(Debug, Default)]
pub struct RunoutSensor {
    armed: bool,
    last_state: Option<bool>,
}

impl RunoutSensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn arm(&mut self) {
        self.armed = true;
        self.last_state = Some(true);
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Feed a sensor edge; returns true when a runout should be handled.
    ///
    /// The sensor disarms itself when it fires so one runout is reported once.
    pub fn handle_edge(&mut self, present: bool, printing: bool) -> bool {
        let was_present = self.last_state.replace(present).unwrap_or(true);
        let fired = self.armed && printing && was_present && !present;
        if fired {
            self.armed = false;
            debug!("Selector filament sensor lost filament while armed");
        }
        fired
    }
}

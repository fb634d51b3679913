//! Extruder / filament driver synchronization.
//!
//! The rack's filament driver and the machine's extruder are separate
//! steppers, each normally fed by its own motion source. During a tool change
//! one of them is temporarily rebound so both push filament together:
//!
//! - `ExtruderDrivesDriver`: the extruder stepper follows the rack's filament
//!   axis (loading and unloading the toolhead)
//! - `DriverDrivesExtruder`: the filament driver follows the machine's
//!   extruder axis (printing with the driver engaged)
//!
//! Only one stepper is rebound at a time. Switching between the two synced
//! states always passes through `Unsynced`, and every rebinding is preceded by
//! flushing step generation on both motion sources.

mod snapshot;

#[cfg(test)]
mod tests;

use snapshot::SyncSnapshot;

use tracing::{debug, info};
use tradrack_types::{MotionSource, RackEvent, StepperBinding, StepperId, SyncState, ValidationError};

use crate::events::EventLog;
use crate::host::MotionHost;

/// Owner of the shared stepper binding.
#[derive(Debug, Default)]
pub struct ExtruderSyncManager {
    state: SyncState,
    previous: Option<SyncSnapshot>,
}

impl ExtruderSyncManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_extruder_synced(&self) -> bool {
        self.state == SyncState::ExtruderDrivesDriver
    }

    pub fn is_driver_synced(&self) -> bool {
        self.state == SyncState::DriverDrivesExtruder
    }

    /// Drive the extruder stepper from the rack's filament axis.
    pub fn sync_extruder_to_driver<H: MotionHost>(&mut self, host: &mut H, events: &mut EventLog) {
        match self.state {
            SyncState::ExtruderDrivesDriver => return,
            SyncState::DriverDrivesExtruder => self.unsync(host, events),
            SyncState::Unsynced => {},
        }
        self.rebind(host, StepperId::Extruder, StepperBinding::rack_filament());
        self.state = SyncState::ExtruderDrivesDriver;
        debug!("Extruder synced to filament driver");
    }

    /// Drive the filament driver from the machine's extruder axis.
    pub fn sync_driver_to_extruder<H: MotionHost>(&mut self, host: &mut H, events: &mut EventLog) {
        match self.state {
            SyncState::DriverDrivesExtruder => return,
            SyncState::ExtruderDrivesDriver => self.unsync(host, events),
            SyncState::Unsynced => {},
        }
        self.rebind(host, StepperId::FilamentDriver, StepperBinding::machine_extruder());
        self.state = SyncState::DriverDrivesExtruder;
        info!("Filament driver synced to extruder");
        events.emit(RackEvent::SyncedToExtruder);
    }

    /// Return the rebound stepper to its previous binding.
    pub fn unsync<H: MotionHost>(&mut self, host: &mut H, events: &mut EventLog) {
        let Some(snapshot) = self.previous.take() else {
            self.state = SyncState::Unsynced;
            return;
        };
        if self.state == SyncState::DriverDrivesExtruder {
            events.emit(RackEvent::UnsyncingFromExtruder);
        }

        flush_all(host);
        let current = host.rebind_stepper(snapshot.stepper, snapshot.binding);
        host.set_stepper_position(snapshot.stepper, host.source_position(snapshot.binding.source));
        host.unregister_step_generator(current.source, snapshot.stepper);
        host.register_step_generator(snapshot.binding.source, snapshot.stepper);
        host.set_distance_per_revolution(snapshot.stepper, snapshot.distance_per_revolution);

        debug!(stepper = ?snapshot.stepper, from = %self.state, "Stepper unsynced");
        self.state = SyncState::Unsynced;
    }

    /// Scale the filament driver relative to the extruder.
    ///
    /// A factor above 1 makes the driver push more filament than the extruder
    /// consumes. Only valid while the driver follows the extruder.
    pub fn set_driver_multiplier<H: MotionHost>(
        &mut self,
        host: &mut H,
        factor: f64,
    ) -> Result<(), ValidationError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(ValidationError::InvalidMultiplier { factor });
        }
        let Some(snapshot) = self.previous.as_ref().filter(|_| self.is_driver_synced()) else {
            return Err(ValidationError::DriverNotSynced);
        };

        host.flush_step_generation(MotionSource::Machine);
        host.set_distance_per_revolution(StepperId::FilamentDriver, snapshot.distance_per_revolution / factor);
        debug!(factor, "Set filament driver multiplier");
        Ok(())
    }

    fn rebind<H: MotionHost>(&mut self, host: &mut H, stepper: StepperId, target: StepperBinding) {
        flush_all(host);
        let distance_per_revolution = host.distance_per_revolution(stepper);
        let binding = host.rebind_stepper(stepper, target);
        host.set_stepper_position(stepper, host.source_position(target.source));
        host.unregister_step_generator(binding.source, stepper);
        host.register_step_generator(target.source, stepper);
        self.previous = Some(SyncSnapshot { stepper, binding, distance_per_revolution });
    }
}

/// Generate every pending step on both motion sources.
fn flush_all<H: MotionHost>(host: &mut H) {
    host.flush_step_generation(MotionSource::Machine);
    host.flush_step_generation(MotionSource::Rack);
}

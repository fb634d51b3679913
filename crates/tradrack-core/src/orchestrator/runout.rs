//! Runout detection and automatic lane replacement.

use tracing::{info, warn};
use tradrack_types::{LoadRequest, RackError, RackEvent, ResumeAction, RunoutPhase};

use super::resume::Interrupted;
use super::unload::UnloadMode;
use super::ToolChangeOrchestrator;
use crate::host::{MotionHost, ProcessControl};
use crate::storage::VariableStore;

impl<H: MotionHost, S: VariableStore, P: ProcessControl> ToolChangeOrchestrator<H, S, P> {
    /// Feed an edge of the selector filament sensor.
    ///
    /// Losing filament while armed and printing pauses the print, ejects the
    /// spent lane and loads another lane of the same tool. The print is
    /// resumed once the replacement is in the toolhead.
    pub fn handle_selector_sensor(&mut self, present: bool) -> Result<(), RackError> {
        if !self.runout.handle_edge(present, self.process.is_printing()) {
            return Ok(());
        }
        let Some(lane) = self.active_lane else {
            return Ok(());
        };

        info!(lane, "Runout detected");
        self.events.emit(RackEvent::RunoutDetected { lane });
        self.process.pause();
        self.run_runout(lane, RunoutPhase::Detected, None)
    }

    fn run_runout(
        &mut self,
        failed_lane: usize,
        phase: RunoutPhase,
        replacement: Option<usize>,
    ) -> Result<(), RackError> {
        match self.continue_runout(failed_lane, phase, replacement) {
            Ok(()) => {
                if self.process.is_paused() {
                    self.process.resume();
                }
                self.take_persist_error()
            },
            Err(Interrupted { resume_at, error }) => Err(self.interrupt(resume_at, error)),
        }
    }

    /// Run runout recovery from `phase` onward.
    ///
    /// A failure reports the phase to re-enter so a resume does not repeat
    /// steps that already completed.
    pub(super) fn continue_runout(
        &mut self,
        failed_lane: usize,
        mut phase: RunoutPhase,
        mut replacement: Option<usize>,
    ) -> Result<(), Interrupted> {
        let at = |phase: RunoutPhase, replacement: Option<usize>| {
            move |error: RackError| Interrupted {
                resume_at: ResumeAction::RunoutReplace { failed_lane, phase, replacement },
                error,
            }
        };

        // On a resume the user may have refilled the spent lane
        let resumed = phase != RunoutPhase::Detected;

        if phase == RunoutPhase::Detected {
            self.runout.disarm();
            self.active_lane = None;
            self.persist_active_lane();
            self.lanes[failed_lane].unloaded = false;
            self.lanes[failed_lane].dead = true;
            phase = RunoutPhase::Unloading;
        }

        if phase == RunoutPhase::Unloading {
            self.unload_toolhead_inner(UnloadMode::Runout).map_err(at(phase, None))?;
            phase = RunoutPhase::FindingReplacement;
        }

        if phase == RunoutPhase::LoadingReplacement && replacement.is_none() {
            phase = RunoutPhase::FindingReplacement;
        }

        if phase == RunoutPhase::FindingReplacement {
            let mut found = self.find_replacement_lane(failed_lane).map_err(at(phase, None))?;
            if found.is_none() && resumed && self.reload_spent_lane(failed_lane).map_err(at(phase, None))? {
                found = Some(failed_lane);
            }
            match found {
                Some(lane) => {
                    replacement = Some(lane);
                    phase = RunoutPhase::LoadingReplacement;
                },
                None => {
                    warn!(failed_lane, "No replacement lane for runout");
                    return Err(at(phase, None)(RackError::RunoutUnrecoverable { lane: failed_lane }));
                },
            }
        }

        if let (RunoutPhase::LoadingReplacement, Some(lane)) = (phase, replacement) {
            self.load_replacement(lane).map_err(at(phase, Some(lane)))?;
        }

        info!(failed_lane, replacement = ?replacement, "Runout recovery complete");
        Ok(())
    }

    /// Try the lane that ran out again, in case it was refilled.
    fn reload_spent_lane(&mut self, lane: usize) -> Result<bool, RackError> {
        match self.load_selector(lane) {
            Ok(()) => {
                self.lanes[lane].dead = false;
                info!(lane, "Spent lane was refilled");
                Ok(true)
            },
            Err(e @ RackError::LoadFailed { .. }) => {
                warn!(lane, error = %e, "Spent lane still empty");
                Ok(false)
            },
            Err(e) => Err(e),
        }
    }

    fn load_replacement(&mut self, lane: usize) -> Result<(), RackError> {
        self.reload_retry_lane()?;
        if self.curr_lane != Some(lane) || !self.selector_has_filament() {
            self.load_selector(lane)?;
        }
        self.events.emit(RackEvent::LoadStarted { lane });
        let mut request = LoadRequest::lane(lane);
        request.heater_target = self.last_heater_target;
        self.load_from_selector(lane, &request)
    }
}

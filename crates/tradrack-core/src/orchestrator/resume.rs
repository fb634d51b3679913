//! Resume stack driver.

use tracing::{info, warn};
use tradrack_types::{RackError, ResumeAction, ValidationError};

use super::selector::Located;
use super::unload::UnloadMode;
use super::ToolChangeOrchestrator;
use crate::host::{MotionHost, ProcessControl};
use crate::storage::VariableStore;

/// A resume action that stopped with an error.
#[derive(Debug)]
pub(super) struct Interrupted {
    /// Entry to leave on the stack for the next attempt
    pub resume_at: ResumeAction,
    pub error: RackError,
}

/// What a dispatched action asks of the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Done,
    /// Put the action back and wait for the next resume
    Retry,
}

impl<H: MotionHost, S: VariableStore, P: ProcessControl> ToolChangeOrchestrator<H, S, P> {
    /// Work through the resume stack.
    ///
    /// Entries run most recent first. The driver stops early when an entry
    /// asks to be retried, pushes follow-up entries or fails; a failing entry
    /// stays on the stack. The process is resumed once the stack is empty.
    pub fn resume(&mut self) -> Result<(), RackError> {
        if self.resume.is_empty() {
            return Err(ValidationError::NothingToResume.into());
        }

        while let Some(action) = self.resume.pop() {
            let depth = self.resume.len();
            info!(kind = ?action.kind(), depth, "Resuming");

            match self.dispatch(action.clone()) {
                Ok(Outcome::Done) if self.resume.len() > depth => return self.take_persist_error(),
                Ok(Outcome::Done) => {},
                Ok(Outcome::Retry) => {
                    self.resume.push(action);
                    return Ok(());
                },
                Err(Interrupted { resume_at, error }) => {
                    let pushed = self.resume.split_off(depth);
                    return Err(self.requeue(resume_at, pushed, error));
                },
            }
        }

        if self.process.is_paused() {
            self.process.resume();
        }
        self.take_persist_error()
    }

    /// Put a failed entry back under anything it pushed, then pause.
    fn requeue(&mut self, entry: ResumeAction, pushed: Vec<ResumeAction>, error: RackError) -> RackError {
        if matches!(error, RackError::Shutdown { .. }) {
            self.host.disable_motor(tradrack_types::Axis::FilamentDriver);
        } else if !error.is_validation() {
            self.make_safe();
        }

        self.resume.push(entry.clone());
        for extra in pushed.into_iter().filter(|e| *e != entry) {
            self.resume.push(extra);
        }
        if matches!(error, RackError::SelectorNotHomed)
            && self.resume.peek() != Some(&ResumeAction::HomeSelector)
        {
            self.resume.push(ResumeAction::HomeSelector);
        }

        warn!(error = %error, depth = self.resume.len(), "Resume interrupted");
        self.process.pause();
        error
    }

    fn dispatch(&mut self, action: ResumeAction) -> Result<Outcome, Interrupted> {
        let interrupted = |error| Interrupted { resume_at: action.clone(), error };

        match &action {
            ResumeAction::LoadToolhead(request) => {
                self.reload_retry_lane().map_err(interrupted)?;
                self.load_toolhead_inner(request).map_err(interrupted)?;
            },
            ResumeAction::ReloadLane { lane } => {
                self.load_lane_inner(*lane, false).map_err(interrupted)?;
            },
            ResumeAction::HomeSelector => {
                if self.selector_has_filament() {
                    let Some(active) = self.active_lane else {
                        warn!("Remove the filament from the selector, then resume");
                        return Ok(Outcome::Retry);
                    };
                    self.set_active_lane_inner(active);
                } else {
                    self.home_selector_inner().map_err(interrupted)?;
                }
            },
            ResumeAction::UnloadToolhead => {
                self.unload_toolhead_inner(UnloadMode::Normal).map_err(interrupted)?;
            },
            ResumeAction::RunoutReplace { failed_lane, phase, replacement } => {
                self.continue_runout(*failed_lane, *phase, *replacement)?;
            },
            ResumeAction::LocateSelector => {
                if self.locate_selector_inner().map_err(interrupted)? == Located::NeedsUser {
                    return Ok(Outcome::Retry);
                }
            },
            ResumeAction::CalibrateSelector { stage, first_lane_distance } => {
                self.calibrate_selector_stage(*stage, *first_lane_distance)
                    .map_err(interrupted)?;
            },
        }
        Ok(Outcome::Done)
    }
}

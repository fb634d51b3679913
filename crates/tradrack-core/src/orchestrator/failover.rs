//! Replacement lane search for a tool whose lane failed or ran out.

use tracing::{info, warn};
use tradrack_types::RackError;

use super::ToolChangeOrchestrator;
use crate::host::{MotionHost, ProcessControl};
use crate::lanes::{FailoverPass, FailoverScan};
use crate::storage::VariableStore;

impl<H: MotionHost, S: VariableStore, P: ProcessControl> ToolChangeOrchestrator<H, S, P> {
    /// Find another lane of the same tool and load it into the selector.
    ///
    /// Healthy lanes are tried first, then lanes that failed earlier. A lane
    /// that fails here is marked dead; one that loads becomes the tool's
    /// default. Returns `None` when every candidate failed.
    pub fn find_replacement_lane(&mut self, failed_lane: usize) -> Result<Option<usize>, RackError> {
        self.check_lane(failed_lane)?;
        let candidates = self.tool_map.replacement_candidates(failed_lane);
        let scan = FailoverScan::new(&candidates, |lane| self.lanes[lane].dead);

        for (lane, pass) in scan {
            match self.load_selector(lane) {
                Ok(()) => {
                    self.lanes[lane].dead = false;
                    if let Some(tool) = self.tool_map.tool_of(lane) {
                        self.tool_map.set_default(tool, Some(lane))?;
                    }
                    info!(failed_lane, lane, ?pass, "Replacement lane loaded");
                    return Ok(Some(lane));
                },
                Err(e @ RackError::LoadFailed { .. }) => {
                    self.lanes[lane].dead = true;
                    if pass == FailoverPass::Second {
                        warn!(lane, error = %e, "Previously failed lane failed again");
                    } else {
                        warn!(lane, error = %e, "Replacement lane failed to load");
                    }
                },
                Err(e) => return Err(e),
            }
        }

        warn!(failed_lane, "No replacement lane available");
        Ok(None)
    }
}

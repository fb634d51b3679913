//! Candidate ordering for lane failover.

use std::collections::VecDeque;

/// Which pass of the failover scan produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverPass {
    /// Lanes not known to be dead
    First,
    /// Lanes that were already dead when the scan started
    Second,
}

/// Ordered replacement candidates for a failed lane.
///
/// Lanes already marked dead are held back until every other candidate has
/// been tried, then retried once in their original order.
#[derive(Debug, Clone)]
pub struct FailoverScan {
    first: VecDeque<usize>,
    second: VecDeque<usize>,
}

impl FailoverScan {
    pub fn new(candidates: &[usize], is_dead: impl Fn(usize) -> bool) -> Self {
        let (dead, alive): (Vec<usize>, Vec<usize>) =
            candidates.iter().copied().partition(|lane| is_dead(*lane));
        Self { first: alive.into(), second: dead.into() }
    }
}

impl Iterator for FailoverScan {
    type Item = (usize, FailoverPass);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(lane) = self.first.pop_front() {
            return Some((lane, FailoverPass::First));
        }
        self.second.pop_front().map(|lane| (lane, FailoverPass::Second))
    }
}

//! LIFO stack of pending recovery actions.

use tradrack_types::{ResumeAction, ResumeKind};

/// Pending [`ResumeAction`]s, newest on top.
#[derive(Debug, Default, Clone)]
pub struct ResumeStack {
    entries: Vec<ResumeAction>,
}

impl ResumeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: ResumeAction) {
        self.entries.push(action);
    }

    pub fn pop(&mut self) -> Option<ResumeAction> {
        self.entries.pop()
    }

    pub fn peek(&self) -> Option<&ResumeAction> {
        self.entries.last()
    }

    pub fn peek_kind(&self) -> Option<ResumeKind> {
        self.peek().map(ResumeAction::kind)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove everything above `depth`, oldest first.
    pub fn split_off(&mut self, depth: usize) -> Vec<ResumeAction> {
        self.entries.split_off(depth.min(self.entries.len()))
    }

    /// Entries from bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &ResumeAction> {
        self.entries.iter()
    }
}

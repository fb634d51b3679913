//! Outgoing notification buffer.

use tracing::debug;
use tradrack_types::RackEvent;

/// Events emitted since the embedding host last drained them.
#[derive(Debug, Default)]
pub struct EventLog {
    pending: Vec<RackEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: RackEvent) {
        debug!(event = event.name(), "Rack event");
        self.pending.push(event);
    }

    /// Take every pending event in emission order.
    pub fn drain(&mut self) -> Vec<RackEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &[RackEvent] {
        &self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order_and_clears() {
        let mut log = EventLog::new();
        log.emit(RackEvent::LoadStarted { lane: 1 });
        log.emit(RackEvent::LoadComplete { lane: 1 });

        assert_eq!(log.pending().len(), 2);
        assert_eq!(
            log.drain(),
            vec![RackEvent::LoadStarted { lane: 1 }, RackEvent::LoadComplete { lane: 1 }]
        );
        assert!(log.pending().is_empty());
    }
}

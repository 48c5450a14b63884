//! Correlation queue: strictly FIFO, single consumer.

use std::collections::VecDeque;

use peacemaker_types::{CorrelationId, QueuedEvent};

/// Pending events in arrival order.
///
/// Lives only in memory for the bridge's lifetime. An event is removed
/// before it is processed, so a crash loses at most the in-flight event.
#[derive(Debug, Default)]
pub struct CorrelationQueue {
    events: VecDeque<QueuedEvent>,
}

impl CorrelationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: QueuedEvent) {
        self.events.push_back(event);
    }

    pub fn pop_front(&mut self) -> Option<QueuedEvent> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Ids of pending events, front first.
    pub fn pending_ids(&self) -> Vec<CorrelationId> {
        self.events.iter().map(|e| e.id.clone()).collect()
    }

    /// Drop every pending event, returning them in arrival order.
    pub fn clear(&mut self) -> Vec<QueuedEvent> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peacemaker_types::Operation;

    #[test]
    fn test_fifo_order() {
        let mut queue = CorrelationQueue::new();
        for id in ["a", "b", "c"] {
            queue.push(QueuedEvent::new(id, Operation::Logout));
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pending_ids(), vec!["a", "b", "c"]);

        assert_eq!(queue.pop_front().unwrap().id, "a");
        queue.push(QueuedEvent::new("d", Operation::Logout));
        assert_eq!(queue.pending_ids(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_clear_returns_abandoned_events() {
        let mut queue = CorrelationQueue::new();
        queue.push(QueuedEvent::new("x", Operation::Logout));
        queue.push(QueuedEvent::new("y", Operation::Logout));

        let abandoned = queue.clear();
        assert_eq!(abandoned.len(), 2);
        assert_eq!(abandoned[1].id, "y");
        assert!(queue.is_empty());
        assert!(queue.pop_front().is_none());
    }
}

//! Handoff seam to the asynchronous delivery stage. The orchestrator
//! only enqueues a campaign id; sending, per-email outcomes, and the
//! terminal status transition belong to the consumer on the other side.

use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::info;
use uuid::Uuid;

pub trait DeliverySink: Send + Sync {
    fn enqueue(&self, campaign_id: Uuid);
}

/// Queue-backed sink for development and tests.
#[derive(Default)]
pub struct InMemoryDeliveryQueue {
    queue: Mutex<VecDeque<Uuid>>,
}

impl InMemoryDeliveryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Uuid> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl DeliverySink for InMemoryDeliveryQueue {
    fn enqueue(&self, campaign_id: Uuid) {
        info!(campaign_id = %campaign_id, "campaign handed off for delivery");
        self.queue.lock().push_back(campaign_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_and_drain_preserve_order() {
        let queue = InMemoryDeliveryQueue::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        queue.enqueue(a);
        queue.enqueue(b);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.drain(), vec![a, b]);
        assert!(queue.is_empty());
    }
}

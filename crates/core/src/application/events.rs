// Queue Event Hub - fan-out of committed changes to observers

use crate::domain::{QueueEvent, QueueId};
use crate::port::EventPublisher;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// Default number of events buffered per subscriber
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Broadcast hub for queue events
///
/// Publishing never blocks. A subscriber that falls more than `capacity`
/// events behind skips the oldest ones.
pub struct QueueEventHub {
    tx: broadcast::Sender<QueueEvent>,
}

impl QueueEventHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive events for one queue only
    pub fn subscribe(&self, queue_id: impl Into<String>) -> QueueSubscription {
        QueueSubscription {
            queue_id: queue_id.into(),
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for QueueEventHub {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventPublisher for QueueEventHub {
    fn publish(&self, event: QueueEvent) {
        if self.tx.send(event).is_err() {
            debug!("No subscribers for queue event");
        }
    }
}

/// Filtered view of the hub for a single queue
pub struct QueueSubscription {
    queue_id: QueueId,
    rx: broadcast::Receiver<QueueEvent>,
}

impl QueueSubscription {
    pub fn queue_id(&self) -> &str {
        &self.queue_id
    }

    /// Next event for this queue; `None` once the hub is gone
    pub async fn recv(&mut self) -> Option<QueueEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.queue_id == self.queue_id => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        queue_id = %self.queue_id,
                        skipped = skipped,
                        "Queue subscriber lagged, events dropped"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

// Event Publisher Port

use crate::domain::QueueEvent;

/// Sink for committed queue events
///
/// Called after the commit while the per-queue lock is still held, so it
/// must not block or wait on another queue operation.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: QueueEvent);
}

/// Publisher that drops every event (tests, embedded use)
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: QueueEvent) {}
}

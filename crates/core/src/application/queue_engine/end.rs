// End Queue Use Case

use super::existing;
use crate::domain::Queue;
use crate::error::Result;
use crate::port::{with_lock_notify, LockOutcome, QueueStore, TimeProvider};

/// Result of ending a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOutcome {
    /// Queue as stored after the call (people left untouched)
    pub queue: Queue,
    /// False when the queue had already been ended earlier
    pub newly_closed: bool,
}

/// Execute end use case (idempotent)
pub async fn execute(
    store: &dyn QueueStore,
    time_provider: &dyn TimeProvider,
    queue_id: &str,
    on_commit: impl FnOnce(&EndOutcome),
) -> Result<EndOutcome> {
    with_lock_notify(
        store,
        queue_id,
        |current| {
            let queue = existing(current, queue_id)?;

            let mut next = queue.clone();
            if next.close(time_provider.now_millis()) {
                Ok(LockOutcome::Commit(
                    next.clone(),
                    EndOutcome {
                        queue: next,
                        newly_closed: true,
                    },
                ))
            } else {
                Ok(LockOutcome::Release(EndOutcome {
                    queue: next,
                    newly_closed: false,
                }))
            }
        },
        on_commit,
    )
    .await
}

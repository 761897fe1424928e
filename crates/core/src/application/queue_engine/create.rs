// Create Queue Use Case

use crate::domain::{NewQueue, Queue};
use crate::error::{AppError, Result};
use crate::port::{with_lock_notify, IdProvider, LockOutcome, QueueStore, TimeProvider};
use tracing::debug;

/// Attempts at finding a free queue code before giving up
pub const MAX_CODE_ATTEMPTS: usize = 5;

/// Execute create use case
///
/// # Arguments
///
/// * `store` - Queue store
/// * `id_provider` - ID generator (injected for determinism)
/// * `time_provider` - Time provider (injected for determinism)
/// * `fields` - Descriptive fields of the new queue
/// * `on_commit` - Runs once the queue is stored, before its lock is released
pub async fn execute(
    store: &dyn QueueStore,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    fields: NewQueue,
    on_commit: impl FnOnce(&Queue),
) -> Result<Queue> {
    // Reject bad input before touching the store
    let fields = fields.normalized()?;
    let host_token = id_provider.generate_secret();
    let mut on_commit = Some(on_commit);

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let queue_id = id_provider.generate_code();

        let notify = |created: &Option<Queue>| {
            if let (Some(queue), Some(on_commit)) = (created, on_commit.take()) {
                on_commit(queue);
            }
        };
        let created = with_lock_notify(
            store,
            &queue_id,
            |current| {
                if current.is_some() {
                    return Ok(LockOutcome::Release(None));
                }

                let queue = Queue::open(
                    queue_id.clone(),
                    fields.clone(),
                    host_token.clone(),
                    time_provider.now_millis(),
                )?;
                Ok(LockOutcome::Commit(queue.clone(), Some(queue)))
            },
            notify,
        )
        .await?;

        match created {
            Some(queue) => return Ok(queue),
            None => debug!(attempt, queue_id = %queue_id, "Queue code already taken, retrying"),
        }
    }

    Err(AppError::Internal(format!(
        "could not allocate a free queue id after {} attempts",
        MAX_CODE_ATTEMPTS
    )))
}

// Remove Person Use Case (host removal and participant leave)

use super::existing;
use crate::domain::Person;
use crate::error::Result;
use crate::port::{with_lock_notify, LockOutcome, QueueStore};

/// Execute remove use case
///
/// Returns the removed person, or `None` when they were already gone.
/// Removing an absent person is not an error.
pub async fn execute(
    store: &dyn QueueStore,
    queue_id: &str,
    person_id: &str,
    on_commit: impl FnOnce(&Option<Person>),
) -> Result<Option<Person>> {
    with_lock_notify(
        store,
        queue_id,
        |current| {
            let queue = existing(current, queue_id)?;
            queue.ensure_active()?;

            if queue.person(person_id).is_none() {
                return Ok(LockOutcome::Release(None));
            }

            let mut next = queue.clone();
            let removed = next.remove(person_id)?;
            Ok(LockOutcome::Commit(next, removed))
        },
        on_commit,
    )
    .await
}

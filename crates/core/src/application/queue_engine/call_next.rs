// Call Next Use Case

use super::existing;
use crate::domain::Person;
use crate::error::Result;
use crate::port::{with_lock_notify, LockOutcome, QueueStore};

/// Result of calling the next person
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallNextOutcome {
    /// The former head of the queue, now removed
    Called(Person),
    /// Nobody is waiting; nothing changed
    Empty,
}

impl CallNextOutcome {
    pub fn person(&self) -> Option<&Person> {
        match self {
            CallNextOutcome::Called(person) => Some(person),
            CallNextOutcome::Empty => None,
        }
    }
}

/// Execute call-next use case
///
/// Pop happens under the queue lock, so concurrent callers each get a
/// distinct person, in position order.
pub async fn execute(
    store: &dyn QueueStore,
    queue_id: &str,
    on_commit: impl FnOnce(&CallNextOutcome),
) -> Result<CallNextOutcome> {
    with_lock_notify(
        store,
        queue_id,
        |current| {
            let queue = existing(current, queue_id)?;
            queue.ensure_active()?;

            if queue.people.is_empty() {
                return Ok(LockOutcome::Release(CallNextOutcome::Empty));
            }

            let mut next = queue.clone();
            match next.pop_front()? {
                Some(person) => Ok(LockOutcome::Commit(next, CallNextOutcome::Called(person))),
                None => Ok(LockOutcome::Release(CallNextOutcome::Empty)),
            }
        },
        on_commit,
    )
    .await
}

// Join Queue Use Case

use super::existing;
use crate::domain::{Person, Queue};
use crate::error::{AppError, Result};
use crate::port::{with_lock_notify, IdProvider, LockOutcome, QueueStore, TimeProvider};
use serde::{Deserialize, Serialize};

/// Join request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub queue_id: String,
    pub name: String,
    #[serde(default)]
    pub contact_info: Option<String>,

    /// Client-generated token for at-most-once joins
    #[serde(default)]
    pub join_key: Option<String>,
}

impl JoinRequest {
    pub fn new(queue_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            queue_id: queue_id.into(),
            name: name.into(),
            contact_info: None,
            join_key: None,
        }
    }

    pub fn with_contact(mut self, contact_info: impl Into<String>) -> Self {
        self.contact_info = Some(contact_info.into());
        self
    }

    pub fn with_join_key(mut self, join_key: impl Into<String>) -> Self {
        self.join_key = Some(join_key.into());
        self
    }
}

/// Result of a successful join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub person: Person,
    /// 1-based position right after the join
    pub position: usize,
    /// True when an earlier join with the same key was returned instead
    pub replayed: bool,
}

/// Execute join use case
///
/// Without a join key every call appends a new person, even with an
/// identical name.
pub async fn execute(
    store: &dyn QueueStore,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    req: JoinRequest,
    on_commit: impl FnOnce(&JoinOutcome),
) -> Result<JoinOutcome> {
    let person_id = id_provider.generate_id();
    let join_key = req
        .join_key
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string);

    with_lock_notify(
        store,
        &req.queue_id,
        |current| {
            let queue = existing(current, &req.queue_id)?;
            queue.ensure_active()?;

            if let Some(key) = &join_key {
                if let Some(replay) = replay_join(queue, key)? {
                    return Ok(LockOutcome::Release(replay));
                }
            }

            let person = Person::new(
                person_id,
                &req.name,
                req.contact_info.as_deref(),
                time_provider.now_millis(),
            )?;

            let mut next = queue.clone();
            let position = next.enqueue(person)?;
            let person = next
                .people
                .back()
                .cloned()
                .ok_or_else(|| AppError::Internal("queue empty right after join".to_string()))?;
            if let Some(key) = join_key {
                next.remember_join_key(key, person.id.clone());
            }

            Ok(LockOutcome::Commit(
                next,
                JoinOutcome {
                    person,
                    position,
                    replayed: false,
                },
            ))
        },
        on_commit,
    )
    .await
}

/// Look up an earlier join made with `key`
fn replay_join(queue: &Queue, key: &str) -> Result<Option<JoinOutcome>> {
    let Some(owner) = queue.join_key_owner(key) else {
        return Ok(None);
    };

    match (queue.person(owner), queue.position_of(owner)) {
        (Some(person), Some(position)) => Ok(Some(JoinOutcome {
            person: person.clone(),
            position,
            replayed: true,
        })),
        _ => Err(AppError::Conflict(format!(
            "join key {} belongs to a person who is no longer waiting",
            key
        ))),
    }
}

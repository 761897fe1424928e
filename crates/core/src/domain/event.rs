// Queue Events - what observers of a queue are told after each change

use crate::domain::queue::{Person, PersonId, QueueId};
use serde::{Deserialize, Serialize};

/// Why a person left the waiting order without being called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    Host,
    Left,
}

/// Event payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEventKind {
    Created,
    PersonJoined { person: Person, position: usize },
    PersonCalled { person: Person },
    PersonRemoved { person_id: PersonId, reason: RemovalReason },
    Closed,
}

/// Event published after a mutation has been committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEvent {
    pub queue_id: QueueId,
    pub at: i64, // epoch ms
    #[serde(flatten)]
    pub kind: QueueEventKind,
}

impl QueueEvent {
    pub fn new(queue_id: impl Into<String>, at: i64, kind: QueueEventKind) -> Self {
        Self {
            queue_id: queue_id.into(),
            at,
            kind,
        }
    }
}

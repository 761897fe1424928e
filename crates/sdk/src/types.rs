//! SDK Request/Response Types
//!
//! Mirrors the JSON-RPC types from the api-rpc crate.

use serde::{Deserialize, Serialize};

/// One participant entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    pub joined_at: i64,
}

/// A waiting person with the position derived by the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingPerson {
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_wait_minutes: Option<u64>,
    #[serde(flatten)]
    pub person: Person,
}

/// Queue snapshot as returned by queue.get.v1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    #[serde(default)]
    pub time_per_person: Option<u32>,
    pub is_active: bool,
    pub created_at: i64,
    #[serde(default)]
    pub ended_at: Option<i64>,
    pub people: Vec<WaitingPerson>,
}

impl QueueSnapshot {
    pub fn position_of(&self, person_id: &str) -> Option<usize> {
        self.people
            .iter()
            .find(|p| p.person.id == person_id)
            .map(|p| p.position)
    }
}

/// Request to open a queue
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateQueueRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_per_person: Option<u32>,
}

impl CreateQueueRequest {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Created queue plus the host capability token
#[derive(Debug, Clone, Deserialize)]
pub struct CreateQueueResponse {
    pub queue: QueueSnapshot,
    pub host_token: String,
}

/// Request to join a queue
#[derive(Debug, Clone, Serialize)]
pub struct JoinQueueRequest {
    pub queue_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub join_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinQueueResponse {
    pub success: bool,
    pub person: Person,
    pub position: usize,
}

/// Result of calling the next person
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallNextOutcome {
    Called { person: Person },
    Empty,
}

impl CallNextOutcome {
    pub fn person(&self) -> Option<&Person> {
        match self {
            CallNextOutcome::Called { person } => Some(person),
            CallNextOutcome::Empty => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemovalResponse {
    pub removed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndQueueResponse {
    pub ended: bool,
    pub queue: QueueSnapshot,
}

/// Why a person left without being called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    Host,
    Left,
}

/// Event payload pushed over a subscription
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEventKind {
    Created,
    PersonJoined { person: Person, position: usize },
    PersonCalled { person: Person },
    PersonRemoved { person_id: String, reason: RemovalReason },
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueueEvent {
    pub queue_id: String,
    pub at: i64,
    #[serde(flatten)]
    pub kind: QueueEventKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_next_outcome_decodes_both_shapes() {
        let empty: CallNextOutcome = serde_json::from_value(json!({"status": "empty"})).unwrap();
        assert_eq!(empty, CallNextOutcome::Empty);
        assert!(empty.person().is_none());

        let called: CallNextOutcome = serde_json::from_value(json!({
            "status": "called",
            "person": {"id": "p1", "name": "Alice", "joined_at": 10}
        }))
        .unwrap();
        assert_eq!(called.person().map(|p| p.name.as_str()), Some("Alice"));
    }

    #[test]
    fn test_snapshot_positions() {
        let snapshot: QueueSnapshot = serde_json::from_value(json!({
            "id": "q1",
            "name": "Barber",
            "description": "",
            "location": "",
            "time_per_person": 10,
            "is_active": true,
            "created_at": 1,
            "people": [
                {"position": 1, "id": "p1", "name": "Alice", "joined_at": 2},
                {"position": 2, "estimated_wait_minutes": 10, "id": "p2", "name": "Bob", "joined_at": 3}
            ]
        }))
        .unwrap();

        assert_eq!(snapshot.position_of("p2"), Some(2));
        assert_eq!(snapshot.people[1].estimated_wait_minutes, Some(10));
        assert_eq!(snapshot.position_of("p9"), None);
    }

    #[test]
    fn test_event_decodes() {
        let event: QueueEvent = serde_json::from_value(json!({
            "queue_id": "q1",
            "at": 5,
            "type": "person_removed",
            "person_id": "p1",
            "reason": "left"
        }))
        .unwrap();

        assert_eq!(
            event.kind,
            QueueEventKind::PersonRemoved {
                person_id: "p1".to_string(),
                reason: RemovalReason::Left
            }
        );
    }
}

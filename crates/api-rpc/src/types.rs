//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results. Every method takes one object.

use serde::{Deserialize, Serialize};
use waitline_core::domain::{Person, QueueSnapshot};

/// queue.create.v1 - Open a queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQueueRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub time_per_person: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQueueResponse {
    pub queue: QueueSnapshot,
    pub host_token: String,
}

/// queue.join.v1 - Join a queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinQueueRequest {
    pub queue_id: String,
    pub name: String,
    #[serde(default)]
    pub contact_info: Option<String>,
    #[serde(default)]
    pub join_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinQueueResponse {
    pub success: bool,
    pub person: Person,
    pub position: usize,
}

/// queue.get.v1 - Read a queue snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetQueueRequest {
    pub queue_id: String,
}

/// queue.call_next.v1 - Dequeue the head
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallNextRequest {
    pub queue_id: String,
    #[serde(default)]
    pub host_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CallNextResponse {
    Called { person: Person },
    Empty,
}

/// queue.remove_person.v1 - Host removes a person
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovePersonRequest {
    pub queue_id: String,
    pub person_id: String,
    #[serde(default)]
    pub host_token: Option<String>,
}

/// queue.leave.v1 - Participant leaves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveQueueRequest {
    pub queue_id: String,
    pub person_id: String,
}

/// Shared result of remove_person and leave
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalResponse {
    pub removed: bool,
}

/// queue.end.v1 - Close a queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndQueueRequest {
    pub queue_id: String,
    #[serde(default)]
    pub host_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndQueueResponse {
    pub ended: bool,
    pub queue: QueueSnapshot,
}

/// queue.subscribe.v1 - Stream events for one queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub queue_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_next_wire_shape() {
        let empty = serde_json::to_value(CallNextResponse::Empty).unwrap();
        assert_eq!(empty, serde_json::json!({"status": "empty"}));

        let person = Person::new("p1", "Alice", None, 5).unwrap();
        let called = serde_json::to_value(CallNextResponse::Called { person }).unwrap();
        assert_eq!(called["status"], "called");
        assert_eq!(called["person"]["name"], "Alice");
    }

    #[test]
    fn test_optional_fields_default() {
        let req: CreateQueueRequest =
            serde_json::from_value(serde_json::json!({"name": "Barber"})).unwrap();
        assert!(req.description.is_none());
        assert!(req.time_per_person.is_none());
    }
}

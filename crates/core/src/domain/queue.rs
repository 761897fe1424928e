// Queue Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Queue identifier (short opaque code)
pub type QueueId = String;

/// Person identifier (UUID v4)
pub type PersonId = String;

/// Maximum length of a queue or person name (chars, after trimming)
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length of free-text fields (description, location, contact info)
pub const MAX_TEXT_LEN: usize = 500;

/// One participant waiting in a queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
    pub joined_at: i64, // epoch ms
}

impl Person {
    /// Create a person, normalizing name and contact info
    ///
    /// # Arguments
    ///
    /// * `id` - Unique person ID (injected, not generated)
    /// * `name` - Display name, must be non-empty after trimming
    /// * `contact_info` - Optional contact string; blank becomes `None`
    /// * `joined_at` - Join timestamp in epoch ms (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        name: &str,
        contact_info: Option<&str>,
        joined_at: i64,
    ) -> Result<Self> {
        Ok(Self {
            id: id.into(),
            name: required_name("person name", name)?,
            contact_info: optional_text("contact info", contact_info)?,
            joined_at,
        })
    }
}

/// Descriptive fields supplied when a queue is opened
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQueue {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    /// Estimated service time per person in minutes (informational only)
    #[serde(default)]
    pub time_per_person: Option<u32>,
}

impl NewQueue {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Trim and validate all fields
    pub fn normalized(self) -> Result<Self> {
        if self.time_per_person == Some(0) {
            return Err(DomainError::Validation(
                "time per person must be positive".to_string(),
            ));
        }

        Ok(Self {
            name: required_name("queue name", &self.name)?,
            description: optional_text("description", Some(&self.description))?
                .unwrap_or_default(),
            location: optional_text("location", Some(&self.location))?.unwrap_or_default(),
            time_per_person: self.time_per_person,
        })
    }
}

/// Queue aggregate
///
/// `people` is kept in FIFO order; a person's position is always derived
/// from its rank here and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Queue {
    pub id: QueueId,
    pub name: String,
    pub description: String,
    pub location: String,
    pub time_per_person: Option<u32>,
    pub is_active: bool,
    pub people: VecDeque<Person>,
    pub created_at: i64,
    pub ended_at: Option<i64>,

    /// Capability issued to the host at creation
    pub host_token: String,

    /// Client idempotency keys -> person created by that join
    #[serde(default)]
    pub join_keys: BTreeMap<String, PersonId>,
}

impl Queue {
    /// Open a new, empty, active queue
    ///
    /// # Arguments
    ///
    /// * `id` - Unique queue ID (injected, not generated)
    /// * `fields` - Descriptive fields, validated here
    /// * `host_token` - Host capability secret
    /// * `created_at` - Creation timestamp in epoch ms
    pub fn open(
        id: impl Into<String>,
        fields: NewQueue,
        host_token: impl Into<String>,
        created_at: i64,
    ) -> Result<Self> {
        let fields = fields.normalized()?;

        Ok(Self {
            id: id.into(),
            name: fields.name,
            description: fields.description,
            location: fields.location,
            time_per_person: fields.time_per_person,
            is_active: true,
            people: VecDeque::new(),
            created_at,
            ended_at: None,
            host_token: host_token.into(),
            join_keys: BTreeMap::new(),
        })
    }

    /// Fail with `QueueClosed` unless the queue still accepts mutations
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active {
            Ok(())
        } else {
            Err(DomainError::QueueClosed(self.id.clone()))
        }
    }

    /// Append a person to the tail and return their 1-based position
    pub fn enqueue(&mut self, mut person: Person) -> Result<usize> {
        self.ensure_active()?;

        if self.people.iter().any(|p| p.id == person.id) {
            return Err(DomainError::Validation(format!(
                "person {} is already in queue {}",
                person.id, self.id
            )));
        }

        // A clock step backwards must not put the newcomer ahead of the tail
        if let Some(tail) = self.people.back() {
            person.joined_at = person.joined_at.max(tail.joined_at);
        }

        self.people.push_back(person);
        Ok(self.people.len())
    }

    /// Remove and return the head of the queue, `None` when nobody waits
    pub fn pop_front(&mut self) -> Result<Option<Person>> {
        self.ensure_active()?;
        Ok(self.people.pop_front())
    }

    /// Remove a person by id; `None` if they are not (or no longer) waiting
    pub fn remove(&mut self, person_id: &str) -> Result<Option<Person>> {
        self.ensure_active()?;
        Ok(self
            .people
            .iter()
            .position(|p| p.id == person_id)
            .and_then(|idx| self.people.remove(idx)))
    }

    /// Deactivate the queue. Returns false if it was already closed.
    pub fn close(&mut self, now_millis: i64) -> bool {
        if !self.is_active {
            return false;
        }
        self.is_active = false;
        self.ended_at = Some(now_millis);
        true
    }

    /// 1-based rank of a person in the current order
    pub fn position_of(&self, person_id: &str) -> Option<usize> {
        self.people
            .iter()
            .position(|p| p.id == person_id)
            .map(|idx| idx + 1)
    }

    pub fn person(&self, person_id: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.id == person_id)
    }

    /// Person previously created under this idempotency key
    pub fn join_key_owner(&self, join_key: &str) -> Option<&PersonId> {
        self.join_keys.get(join_key)
    }

    pub fn remember_join_key(&mut self, join_key: impl Into<String>, person_id: PersonId) {
        self.join_keys.insert(join_key.into(), person_id);
    }

    pub fn verify_host(&self, token: &str) -> bool {
        !self.host_token.is_empty() && self.host_token == token
    }

    /// Estimated wait for a given position, if the queue has an estimate
    pub fn estimated_wait_minutes(&self, position: usize) -> Option<u64> {
        self.time_per_person
            .map(|minutes| (position.saturating_sub(1) as u64) * minutes as u64)
    }

    /// Public view of the queue with derived positions
    pub fn snapshot(&self) -> QueueSnapshot {
        let people = self
            .people
            .iter()
            .enumerate()
            .map(|(idx, person)| PositionedPerson {
                position: idx + 1,
                estimated_wait_minutes: self.estimated_wait_minutes(idx + 1),
                person: person.clone(),
            })
            .collect();

        QueueSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            time_per_person: self.time_per_person,
            is_active: self.is_active,
            created_at: self.created_at,
            ended_at: self.ended_at,
            people,
        }
    }
}

/// A waiting person together with their derived position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionedPerson {
    pub position: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_wait_minutes: Option<u64>,
    #[serde(flatten)]
    pub person: Person,
}

/// Read-only queue view handed to callers (never carries the host token)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub id: QueueId,
    pub name: String,
    pub description: String,
    pub location: String,
    pub time_per_person: Option<u32>,
    pub is_active: bool,
    pub created_at: i64,
    pub ended_at: Option<i64>,
    pub people: Vec<PositionedPerson>,
}

impl QueueSnapshot {
    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn position_of(&self, person_id: &str) -> Option<usize> {
        self.people
            .iter()
            .find(|p| p.person.id == person_id)
            .map(|p| p.position)
    }
}

fn required_name(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation(format!("{} cannot be empty", field)));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::Validation(format!(
            "{} too long (max {} chars)",
            field, MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

fn optional_text(field: &str, value: Option<&str>) -> Result<Option<String>> {
    let Some(trimmed) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(DomainError::Validation(format!(
            "{} too long (max {} chars)",
            field, MAX_TEXT_LEN
        )));
    }
    Ok(Some(trimmed.to_string()))
}

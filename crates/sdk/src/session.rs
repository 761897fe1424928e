//! Participant Session
//!
//! Remembers which queue entry belongs to this participant. The daemon is
//! the only source of truth; nothing here is cached beyond the entry ids.

use crate::client::WaitlineClient;
use crate::error::{Result, SdkError};
use crate::types::{JoinQueueRequest, JoinQueueResponse};
use std::sync::Arc;

/// Queue entry owned by this session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub queue_id: String,
    pub person_id: String,
}

/// Join whose outcome is unknown after a transient failure
struct PendingJoin {
    queue_id: String,
    join_key: String,
}

/// One participant's view of the queue service
pub struct ParticipantSession {
    client: Arc<WaitlineClient>,
    membership: Option<Membership>,
    pending_join: Option<PendingJoin>,
}

impl ParticipantSession {
    pub fn new(client: Arc<WaitlineClient>) -> Self {
        Self {
            client,
            membership: None,
            pending_join: None,
        }
    }

    pub fn membership(&self) -> Option<&Membership> {
        self.membership.as_ref()
    }

    /// Join key to be reused by the next `join` to the same queue
    pub fn pending_join_key(&self) -> Option<&str> {
        self.pending_join.as_ref().map(|p| p.join_key.as_str())
    }

    /// Join a queue, replacing any earlier association
    ///
    /// When a join fails transiently the daemon may still have committed it,
    /// so its join key is kept. Calling `join` again for the same queue
    /// resends that key and gets the original entry back instead of a second
    /// one. Any other outcome forgets the key.
    pub async fn join(
        &mut self,
        queue_id: impl Into<String>,
        name: impl Into<String>,
        contact_info: Option<String>,
    ) -> Result<JoinQueueResponse> {
        let queue_id = queue_id.into();
        let join_key = self.join_key_for(&queue_id);
        let request = JoinQueueRequest {
            queue_id: queue_id.clone(),
            name: name.into(),
            contact_info,
            join_key: Some(join_key.clone()),
        };

        match self.client.join_queue(request).await {
            Ok(response) => {
                self.pending_join = None;
                self.membership = Some(Membership {
                    queue_id,
                    person_id: response.person.id.clone(),
                });
                Ok(response)
            }
            Err(e) => {
                self.pending_join = e
                    .is_transient()
                    .then_some(PendingJoin { queue_id, join_key });
                Err(e)
            }
        }
    }

    fn join_key_for(&self, queue_id: &str) -> String {
        match &self.pending_join {
            Some(pending) if pending.queue_id == queue_id => pending.join_key.clone(),
            _ => uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Current 1-based position; `None` once called, removed or left
    pub async fn position(&self) -> Result<Option<usize>> {
        let membership = self.membership.as_ref().ok_or(SdkError::NotJoined)?;
        let snapshot = self.client.get_queue(&membership.queue_id).await?;

        Ok(snapshot.position_of(&membership.person_id))
    }

    /// Leave the queue and drop the association
    ///
    /// The association is kept only when the call failed transiently, so
    /// the caller can retry.
    pub async fn leave(&mut self) -> Result<bool> {
        let membership = self.membership.take().ok_or(SdkError::NotJoined)?;

        match self
            .client
            .leave_queue(&membership.queue_id, &membership.person_id)
            .await
        {
            Ok(removed) => Ok(removed),
            Err(e) if e.is_transient() => {
                self.membership = Some(membership);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Nothing listens on port 1, so every call fails at the transport
    async fn unreachable_session() -> ParticipantSession {
        let client = WaitlineClient::connect("http://127.0.0.1:1").await.unwrap();
        ParticipantSession::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_transient_join_failure_keeps_key_for_retry() {
        let mut session = unreachable_session().await;

        let err = session.join("q1", "Alice", None).await.unwrap_err();
        assert!(err.is_transient(), "{}", err);
        let first_key = session.pending_join_key().unwrap().to_string();

        session.join("q1", "Alice", None).await.unwrap_err();
        assert_eq!(session.pending_join_key(), Some(first_key.as_str()));
        assert!(session.membership().is_none());
    }

    #[tokio::test]
    async fn test_join_to_another_queue_uses_new_key() {
        let mut session = unreachable_session().await;

        session.join("q1", "Alice", None).await.unwrap_err();
        let first_key = session.pending_join_key().unwrap().to_string();

        session.join("q2", "Alice", None).await.unwrap_err();
        let second_key = session.pending_join_key().unwrap();
        assert_ne!(second_key, first_key);
    }
}

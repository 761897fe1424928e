// Queue Engine - Core use cases for queue management

pub mod call_next;
pub mod create;
pub mod end;
pub mod join;
pub mod remove;

pub use call_next::CallNextOutcome;
pub use end::EndOutcome;
pub use join::{JoinOutcome, JoinRequest};

use crate::domain::{
    NewQueue, Person, Queue, QueueEvent, QueueEventKind, QueueSnapshot, RemovalReason,
};
use crate::error::{AppError, Result};
use crate::port::{EventPublisher, IdProvider, QueueStore, TimeProvider};
use std::sync::Arc;
use tracing::{debug, info};

/// Queue Engine
///
/// Stateless between calls: every operation re-reads the queue under its
/// lock, mutates a copy and writes it back. Events are published after the
/// commit and before the lock is released, so subscribers of one queue see
/// them in commit order.
pub struct QueueEngine {
    store: Arc<dyn QueueStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    events: Arc<dyn EventPublisher>,
}

impl QueueEngine {
    pub fn new(
        store: Arc<dyn QueueStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            store,
            id_provider,
            time_provider,
            events,
        }
    }

    /// Open a new queue; the returned value carries the host token
    pub async fn create_queue(&self, fields: NewQueue) -> Result<Queue> {
        let queue = create::execute(
            self.store.as_ref(),
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            fields,
            |queue| self.emit(&queue.id, QueueEventKind::Created),
        )
        .await?;

        info!(queue_id = %queue.id, name = %queue.name, "Queue created");
        Ok(queue)
    }

    /// Append a person to the tail of a queue
    pub async fn join_queue(&self, req: JoinRequest) -> Result<JoinOutcome> {
        let queue_id = req.queue_id.clone();
        let outcome = join::execute(
            self.store.as_ref(),
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            req,
            |outcome| {
                self.emit(
                    &queue_id,
                    QueueEventKind::PersonJoined {
                        person: outcome.person.clone(),
                        position: outcome.position,
                    },
                )
            },
        )
        .await?;

        if outcome.replayed {
            debug!(
                queue_id = %queue_id,
                person_id = %outcome.person.id,
                "Join replayed from idempotency key"
            );
        } else {
            info!(
                queue_id = %queue_id,
                person_id = %outcome.person.id,
                position = outcome.position,
                "Person joined queue"
            );
        }
        Ok(outcome)
    }

    /// Remove and return the head of the queue
    pub async fn call_next(&self, queue_id: &str) -> Result<CallNextOutcome> {
        let outcome = call_next::execute(self.store.as_ref(), queue_id, |outcome| {
            if let CallNextOutcome::Called(person) = outcome {
                self.emit(
                    queue_id,
                    QueueEventKind::PersonCalled {
                        person: person.clone(),
                    },
                );
            }
        })
        .await?;

        match &outcome {
            CallNextOutcome::Called(person) => {
                info!(queue_id = %queue_id, person_id = %person.id, "Called next person");
            }
            CallNextOutcome::Empty => debug!(queue_id = %queue_id, "Call next on empty queue"),
        }
        Ok(outcome)
    }

    /// Host removes a person; idempotent
    pub async fn remove_person(&self, queue_id: &str, person_id: &str) -> Result<Option<Person>> {
        self.remove_with_reason(queue_id, person_id, RemovalReason::Host)
            .await
    }

    /// Participant leaves; same contract as `remove_person`
    pub async fn leave_queue(&self, queue_id: &str, person_id: &str) -> Result<Option<Person>> {
        self.remove_with_reason(queue_id, person_id, RemovalReason::Left)
            .await
    }

    /// Deactivate a queue; idempotent, people are kept as a record
    pub async fn end_queue(&self, queue_id: &str) -> Result<EndOutcome> {
        let outcome = end::execute(
            self.store.as_ref(),
            self.time_provider.as_ref(),
            queue_id,
            |outcome| {
                if outcome.newly_closed {
                    self.emit(queue_id, QueueEventKind::Closed);
                }
            },
        )
        .await?;

        if outcome.newly_closed {
            info!(
                queue_id = %queue_id,
                waiting = outcome.queue.people.len(),
                "Queue ended"
            );
        } else {
            debug!(queue_id = %queue_id, "Queue already ended");
        }
        Ok(outcome)
    }

    /// Current snapshot with derived positions (active or closed queues)
    pub async fn get_queue(&self, queue_id: &str) -> Result<QueueSnapshot> {
        Ok(self.load(queue_id).await?.snapshot())
    }

    /// Full stored record, including the host token (boundary use only)
    pub async fn load(&self, queue_id: &str) -> Result<Queue> {
        self.store
            .get(queue_id)
            .await?
            .ok_or_else(|| queue_not_found(queue_id))
    }

    async fn remove_with_reason(
        &self,
        queue_id: &str,
        person_id: &str,
        reason: RemovalReason,
    ) -> Result<Option<Person>> {
        let removed = remove::execute(self.store.as_ref(), queue_id, person_id, |removed| {
            if let Some(person) = removed {
                self.emit(
                    queue_id,
                    QueueEventKind::PersonRemoved {
                        person_id: person.id.clone(),
                        reason,
                    },
                );
            }
        })
        .await?;

        match &removed {
            Some(person) => {
                info!(
                    queue_id = %queue_id,
                    person_id = %person.id,
                    reason = ?reason,
                    "Person removed from queue"
                );
            }
            None => debug!(queue_id = %queue_id, person_id = %person_id, "Person already gone"),
        }
        Ok(removed)
    }

    fn emit(&self, queue_id: &str, kind: QueueEventKind) {
        self.events.publish(QueueEvent::new(
            queue_id,
            self.time_provider.now_millis(),
            kind,
        ));
    }
}

/// Unwrap the locked value or fail with `NotFound`
pub(crate) fn existing<'a>(current: Option<&'a Queue>, queue_id: &str) -> Result<&'a Queue> {
    current.ok_or_else(|| queue_not_found(queue_id))
}

fn queue_not_found(queue_id: &str) -> AppError {
    AppError::NotFound(format!("Queue {} not found", queue_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::QueueEventHub;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::queue_store::mocks::MockQueueStore;
    use crate::port::time_provider::mocks::ManualClock;
    use std::collections::HashSet;

    struct Harness {
        engine: Arc<QueueEngine>,
        store: Arc<MockQueueStore>,
        hub: Arc<QueueEventHub>,
    }

    fn harness_with(ids: SequentialIdProvider) -> Harness {
        let store = Arc::new(MockQueueStore::new());
        let hub = Arc::new(QueueEventHub::new(64));
        let engine = Arc::new(QueueEngine::new(
            store.clone(),
            Arc::new(ids),
            Arc::new(ManualClock::ticking(1_000, 10)),
            hub.clone(),
        ));
        Harness { engine, store, hub }
    }

    fn harness() -> Harness {
        harness_with(SequentialIdProvider::new())
    }

    async fn barber(h: &Harness) -> Queue {
        h.engine
            .create_queue(NewQueue::named("Barber"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_queue_defaults() {
        let h = harness();
        let queue = barber(&h).await;

        assert!(queue.is_active);
        assert!(queue.people.is_empty());
        assert!(!queue.host_token.is_empty());
        assert_eq!(h.engine.get_queue(&queue.id).await.unwrap().name, "Barber");
    }

    #[tokio::test]
    async fn test_create_queue_blank_name_is_validation_error() {
        let h = harness();
        let err = h
            .engine
            .create_queue(NewQueue::named("  "))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(h.store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_create_queue_retries_code_collision() {
        let h = harness_with(SequentialIdProvider::with_codes(&["dup", "dup", "fresh"]));
        let first = barber(&h).await;
        let second = barber(&h).await;

        assert_eq!(first.id, "dup");
        assert_eq!(second.id, "fresh");
    }

    #[tokio::test]
    async fn test_create_queue_gives_up_after_repeated_collisions() {
        let h = harness_with(SequentialIdProvider::with_codes(&["dup"; 6]));
        barber(&h).await;

        let err = h
            .engine
            .create_queue(NewQueue::named("Barber"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_barber_scenario() {
        let h = harness();
        let queue = barber(&h).await;

        let alice = h
            .engine
            .join_queue(JoinRequest::new(&queue.id, "Alice"))
            .await
            .unwrap();
        assert_eq!(alice.position, 1);

        let bob = h
            .engine
            .join_queue(JoinRequest::new(&queue.id, "Bob"))
            .await
            .unwrap();
        assert_eq!(bob.position, 2);

        let called = h.engine.call_next(&queue.id).await.unwrap();
        assert_eq!(called.person().map(|p| p.name.as_str()), Some("Alice"));

        let snapshot = h.engine.get_queue(&queue.id).await.unwrap();
        assert_eq!(snapshot.position_of(&bob.person.id), Some(1));

        h.engine
            .remove_person(&queue.id, &bob.person.id)
            .await
            .unwrap();
        assert!(h.engine.get_queue(&queue.id).await.unwrap().is_empty());

        let ended = h.engine.end_queue(&queue.id).await.unwrap();
        assert!(ended.newly_closed);
        assert!(!ended.queue.is_active);

        let err = h
            .engine
            .join_queue(JoinRequest::new(&queue.id, "Carol"))
            .await
            .unwrap_err();
        assert!(err.is_queue_closed());
    }

    #[tokio::test]
    async fn test_join_blank_name_leaves_queue_unchanged() {
        let h = harness();
        let queue = barber(&h).await;
        let commits = h.store.commit_count();

        let err = h
            .engine
            .join_queue(JoinRequest::new(&queue.id, ""))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(h.store.commit_count(), commits);
        assert!(h.engine.get_queue(&queue.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_join_unknown_queue_is_not_found() {
        let h = harness();
        let err = h
            .engine
            .join_queue(JoinRequest::new("missing", "Alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_join_same_name_twice_creates_two_people() {
        let h = harness();
        let queue = barber(&h).await;

        let a = h
            .engine
            .join_queue(JoinRequest::new(&queue.id, "Alice"))
            .await
            .unwrap();
        let b = h
            .engine
            .join_queue(JoinRequest::new(&queue.id, "Alice"))
            .await
            .unwrap();

        assert_ne!(a.person.id, b.person.id);
        assert_eq!(h.engine.get_queue(&queue.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_join_key_replays_instead_of_duplicating() {
        let h = harness();
        let queue = barber(&h).await;

        let first = h
            .engine
            .join_queue(JoinRequest::new(&queue.id, "Alice").with_join_key("k1"))
            .await
            .unwrap();
        let retry = h
            .engine
            .join_queue(JoinRequest::new(&queue.id, "Alice").with_join_key("k1"))
            .await
            .unwrap();

        assert!(!first.replayed);
        assert!(retry.replayed);
        assert_eq!(first.person.id, retry.person.id);
        assert_eq!(h.engine.get_queue(&queue.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_join_key_of_departed_person_conflicts() {
        let h = harness();
        let queue = barber(&h).await;

        h.engine
            .join_queue(JoinRequest::new(&queue.id, "Alice").with_join_key("k1"))
            .await
            .unwrap();
        h.engine.call_next(&queue.id).await.unwrap();

        let err = h
            .engine
            .join_queue(JoinRequest::new(&queue.id, "Alice").with_join_key("k1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_call_next_on_empty_queue_is_not_an_error() {
        let h = harness();
        let queue = barber(&h).await;
        let commits = h.store.commit_count();

        let outcome = h.engine.call_next(&queue.id).await.unwrap();
        assert_eq!(outcome, CallNextOutcome::Empty);
        assert_eq!(h.store.commit_count(), commits);
    }

    #[tokio::test]
    async fn test_concurrent_call_next_returns_distinct_heads() {
        let h = harness();
        let queue = barber(&h).await;
        let mut joined = Vec::new();
        for name in ["Alice", "Bob", "Carol"] {
            let outcome = h
                .engine
                .join_queue(JoinRequest::new(&queue.id, name))
                .await
                .unwrap();
            joined.push(outcome.person.id);
        }

        let mut handles = Vec::new();
        for _ in 0..2 {
            let engine = Arc::clone(&h.engine);
            let queue_id = queue.id.clone();
            handles.push(tokio::spawn(async move {
                engine.call_next(&queue_id).await.unwrap()
            }));
        }

        let mut called = HashSet::new();
        for handle in handles {
            let outcome = handle.await.unwrap();
            called.insert(outcome.person().unwrap().id.clone());
        }

        let expected: HashSet<String> = joined[..2].iter().cloned().collect();
        assert_eq!(called, expected);

        let snapshot = h.engine.get_queue(&queue.id).await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.people[0].person.id, joined[2]);
    }

    #[tokio::test]
    async fn test_remove_person_is_idempotent() {
        let h = harness();
        let queue = barber(&h).await;
        let alice = h
            .engine
            .join_queue(JoinRequest::new(&queue.id, "Alice"))
            .await
            .unwrap();
        h.engine
            .join_queue(JoinRequest::new(&queue.id, "Bob"))
            .await
            .unwrap();

        let first = h
            .engine
            .remove_person(&queue.id, &alice.person.id)
            .await
            .unwrap();
        let after_first = h.engine.get_queue(&queue.id).await.unwrap();
        let second = h
            .engine
            .remove_person(&queue.id, &alice.person.id)
            .await
            .unwrap();
        let after_second = h.engine.get_queue(&queue.id).await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn test_remove_from_unknown_queue_is_not_found() {
        let h = harness();
        let err = h
            .engine
            .remove_person("missing", "p1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_closed_queue_rejects_mutations_but_reads() {
        let h = harness();
        let queue = barber(&h).await;
        let alice = h
            .engine
            .join_queue(JoinRequest::new(&queue.id, "Alice"))
            .await
            .unwrap();
        h.engine.end_queue(&queue.id).await.unwrap();

        assert!(h.engine.call_next(&queue.id).await.unwrap_err().is_queue_closed());
        assert!(h
            .engine
            .remove_person(&queue.id, &alice.person.id)
            .await
            .unwrap_err()
            .is_queue_closed());
        assert!(h
            .engine
            .leave_queue(&queue.id, &alice.person.id)
            .await
            .unwrap_err()
            .is_queue_closed());

        let snapshot = h.engine.get_queue(&queue.id).await.unwrap();
        assert!(!snapshot.is_active);
        assert_eq!(snapshot.position_of(&alice.person.id), Some(1));
    }

    #[tokio::test]
    async fn test_end_queue_is_idempotent() {
        let h = harness();
        let queue = barber(&h).await;

        let first = h.engine.end_queue(&queue.id).await.unwrap();
        let second = h.engine.end_queue(&queue.id).await.unwrap();

        assert!(first.newly_closed);
        assert!(!second.newly_closed);
        assert_eq!(first.queue.ended_at, second.queue.ended_at);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_state_untouched() {
        let h = harness();
        let queue = barber(&h).await;
        h.engine
            .join_queue(JoinRequest::new(&queue.id, "Alice"))
            .await
            .unwrap();
        let before = h.engine.get_queue(&queue.id).await.unwrap();

        h.store.fail_next_commit();
        let err = h.engine.call_next(&queue.id).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        assert_eq!(h.engine.get_queue(&queue.id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_events_follow_mutations() {
        let h = harness();
        let queue = barber(&h).await;
        let mut sub = h.hub.subscribe(queue.id.clone());

        let alice = h
            .engine
            .join_queue(JoinRequest::new(&queue.id, "Alice"))
            .await
            .unwrap();
        h.engine
            .leave_queue(&queue.id, &alice.person.id)
            .await
            .unwrap();
        h.engine.end_queue(&queue.id).await.unwrap();

        let joined = sub.recv().await.unwrap();
        assert!(matches!(
            joined.kind,
            QueueEventKind::PersonJoined { position: 1, .. }
        ));

        let left = sub.recv().await.unwrap();
        assert_eq!(
            left.kind,
            QueueEventKind::PersonRemoved {
                person_id: alice.person.id.clone(),
                reason: RemovalReason::Left,
            }
        );

        assert_eq!(sub.recv().await.unwrap().kind, QueueEventKind::Closed);
    }

    /// Records event kinds and stalls while publishing a join
    struct StallingPublisher {
        seen: std::sync::Mutex<Vec<&'static str>>,
        join_publishing: std::sync::atomic::AtomicBool,
    }

    impl EventPublisher for StallingPublisher {
        fn publish(&self, event: QueueEvent) {
            let kind = match event.kind {
                QueueEventKind::Created => "created",
                QueueEventKind::PersonJoined { .. } => {
                    self.join_publishing
                        .store(true, std::sync::atomic::Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(200));
                    "person_joined"
                }
                QueueEventKind::PersonCalled { .. } => "person_called",
                QueueEventKind::PersonRemoved { .. } => "person_removed",
                QueueEventKind::Closed => "closed",
            };
            self.seen.lock().unwrap().push(kind);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_events_are_published_in_commit_order() {
        let publisher = Arc::new(StallingPublisher {
            seen: std::sync::Mutex::new(Vec::new()),
            join_publishing: std::sync::atomic::AtomicBool::new(false),
        });
        let engine = Arc::new(QueueEngine::new(
            Arc::new(MockQueueStore::new()),
            Arc::new(SequentialIdProvider::new()),
            Arc::new(ManualClock::ticking(1_000, 10)),
            publisher.clone(),
        ));
        let queue = engine
            .create_queue(NewQueue::named("Barber"))
            .await
            .unwrap();

        let join = {
            let engine = Arc::clone(&engine);
            let queue_id = queue.id.clone();
            tokio::spawn(async move {
                engine
                    .join_queue(JoinRequest::new(&queue_id, "Alice"))
                    .await
                    .unwrap()
            })
        };
        while !publisher
            .join_publishing
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        // The join is committed but its event is still being published
        let called = engine.call_next(&queue.id).await.unwrap();
        assert_eq!(called.person().map(|p| p.name.as_str()), Some("Alice"));
        join.await.unwrap();

        assert_eq!(
            *publisher.seen.lock().unwrap(),
            vec!["created", "person_joined", "person_called"]
        );
    }

    #[tokio::test]
    async fn test_failed_commit_publishes_nothing() {
        let h = harness();
        let queue = barber(&h).await;
        h.engine
            .join_queue(JoinRequest::new(&queue.id, "Alice"))
            .await
            .unwrap();
        let mut sub = h.hub.subscribe(queue.id.clone());

        h.store.fail_next_commit();
        assert!(h.engine.call_next(&queue.id).await.is_err());
        h.engine.end_queue(&queue.id).await.unwrap();

        assert_eq!(sub.recv().await.unwrap().kind, QueueEventKind::Closed);
    }
}

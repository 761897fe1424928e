// Queue Store Port (Interface)

use crate::domain::Queue;
use crate::error::{AppError, Result};
use async_trait::async_trait;

/// Exclusive access to one queue slot
///
/// The slot stays locked until the guard is released or dropped. Dropping
/// without committing leaves the stored value untouched.
#[async_trait]
pub trait QueueGuard: Send {
    /// Id of the locked slot
    fn queue_id(&self) -> &str;

    /// Value stored when the lock was taken (`None` if the slot is empty)
    fn current(&self) -> Option<&Queue>;

    /// Persist `queue` as the new value of the slot; the lock stays held
    async fn commit(&mut self, queue: Queue) -> Result<()>;

    /// Unlock without writing
    async fn release(self: Box<Self>) -> Result<()>;
}

/// Repository interface holding every Queue aggregate
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Read the last committed value of a queue
    async fn get(&self, id: &str) -> Result<Option<Queue>>;

    /// Acquire exclusive access to one queue id
    ///
    /// Waiters are served in arrival order. Fails with `AppError::Busy` if the
    /// slot cannot be acquired within the store's lock timeout. Locks on
    /// different ids never wait on each other.
    async fn lock(&self, id: &str) -> Result<Box<dyn QueueGuard>>;
}

/// What a locked transformation decided
pub enum LockOutcome<T> {
    /// Write the queue back, then return the value
    Commit(Queue, T),
    /// Leave the slot unchanged, then return the value
    Release(T),
}

/// Run `f` against the current value of queue `id` under its exclusive lock
///
/// `f` sees `None` when the slot is empty. The store ends up holding exactly
/// what `f` committed, or is unchanged if `f` released or failed.
pub async fn with_lock<T, F>(store: &dyn QueueStore, id: &str, f: F) -> Result<T>
where
    T: Send,
    F: FnOnce(Option<&Queue>) -> Result<LockOutcome<T>>,
{
    with_lock_notify(store, id, f, |_| {}).await
}

/// `with_lock`, plus `on_commit` run after a successful commit and before
/// the lock is released
///
/// Anything `on_commit` does is ordered exactly like the commits of this
/// queue. It runs with the lock held, so it must not block or await.
pub async fn with_lock_notify<T, F, N>(
    store: &dyn QueueStore,
    id: &str,
    f: F,
    on_commit: N,
) -> Result<T>
where
    T: Send,
    F: FnOnce(Option<&Queue>) -> Result<LockOutcome<T>>,
    N: FnOnce(&T),
{
    let mut guard = store.lock(id).await?;
    let outcome = f(guard.current());

    match outcome {
        Ok(LockOutcome::Commit(queue, value)) => {
            if queue.id != guard.queue_id() {
                let msg = format!(
                    "attempted to commit queue {} into slot {}",
                    queue.id,
                    guard.queue_id()
                );
                guard.release().await?;
                return Err(AppError::Internal(msg));
            }
            guard.commit(queue).await?;
            on_commit(&value);
            if let Err(release_err) = guard.release().await {
                tracing::warn!(error = %release_err, queue_id = %id, "Failed to release queue lock");
            }
            Ok(value)
        }
        Ok(LockOutcome::Release(value)) => {
            guard.release().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(release_err) = guard.release().await {
                tracing::warn!(error = %release_err, queue_id = %id, "Failed to release queue lock");
            }
            Err(e)
        }
    }
}

pub mod mocks {
    use super::*;
    use crate::port::{QueueLock, QueueLockTable};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Slots = Arc<Mutex<HashMap<String, Queue>>>;

    /// Store for tests that can be told to fail its next commit
    pub struct MockQueueStore {
        locks: QueueLockTable,
        slots: Slots,
        fail_next_commit: Arc<AtomicBool>,
        commits: Arc<AtomicUsize>,
    }

    impl MockQueueStore {
        pub fn new() -> Self {
            Self::with_timeout(Duration::from_secs(2))
        }

        pub fn with_timeout(timeout: Duration) -> Self {
            Self {
                locks: QueueLockTable::new(timeout),
                slots: Arc::new(Mutex::new(HashMap::new())),
                fail_next_commit: Arc::new(AtomicBool::new(false)),
                commits: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn fail_next_commit(&self) {
            self.fail_next_commit.store(true, Ordering::SeqCst);
        }

        /// Number of successful commits so far
        pub fn commit_count(&self) -> usize {
            self.commits.load(Ordering::SeqCst)
        }
    }

    impl Default for MockQueueStore {
        fn default() -> Self {
            Self::new()
        }
    }

    struct MockGuard {
        queue_id: String,
        current: Option<Queue>,
        slots: Slots,
        fail: Arc<AtomicBool>,
        commits: Arc<AtomicUsize>,
        _lock: QueueLock,
    }

    #[async_trait]
    impl QueueGuard for MockGuard {
        fn queue_id(&self) -> &str {
            &self.queue_id
        }

        fn current(&self) -> Option<&Queue> {
            self.current.as_ref()
        }

        async fn commit(&mut self, queue: Queue) -> Result<()> {
            if self.fail.swap(false, Ordering::SeqCst) {
                return Err(AppError::Database("injected commit failure".to_string()));
            }
            self.slots
                .lock()
                .map_err(|_| AppError::Internal("mock store poisoned".to_string()))?
                .insert(self.queue_id.clone(), queue.clone());
            self.current = Some(queue);
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn release(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl QueueStore for MockQueueStore {
        async fn get(&self, id: &str) -> Result<Option<Queue>> {
            Ok(self
                .slots
                .lock()
                .map_err(|_| AppError::Internal("mock store poisoned".to_string()))?
                .get(id)
                .cloned())
        }

        async fn lock(&self, id: &str) -> Result<Box<dyn QueueGuard>> {
            let lock = self.locks.acquire(id).await?;
            let current = self.get(id).await?;
            Ok(Box::new(MockGuard {
                queue_id: id.to_string(),
                current,
                slots: Arc::clone(&self.slots),
                fail: Arc::clone(&self.fail_next_commit),
                commits: Arc::clone(&self.commits),
                _lock: lock,
            }))
        }
    }
}

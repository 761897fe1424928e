// In-memory QueueStore Implementation

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;
use waitline_core::domain::Queue;
use waitline_core::error::Result;
use waitline_core::port::{QueueGuard, QueueLock, QueueLockTable, QueueStore};

/// Queue store backed by a sharded map
///
/// Committed values and lock slots are both sharded, so unrelated queues
/// never contend. Reads return the last committed value without waiting for
/// an in-flight writer.
pub struct InMemoryQueueStore {
    locks: QueueLockTable,
    queues: Arc<DashMap<String, Queue>>,
}

impl InMemoryQueueStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            locks: QueueLockTable::new(lock_timeout),
            queues: Arc::new(DashMap::new()),
        }
    }

    /// Number of stored queues
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}

impl Default for InMemoryQueueStore {
    fn default() -> Self {
        Self {
            locks: QueueLockTable::default(),
            queues: Arc::new(DashMap::new()),
        }
    }
}

struct MemoryGuard {
    queue_id: String,
    current: Option<Queue>,
    queues: Arc<DashMap<String, Queue>>,
    _lock: QueueLock,
}

#[async_trait]
impl QueueGuard for MemoryGuard {
    fn queue_id(&self) -> &str {
        &self.queue_id
    }

    fn current(&self) -> Option<&Queue> {
        self.current.as_ref()
    }

    async fn commit(&mut self, queue: Queue) -> Result<()> {
        trace!(queue_id = %self.queue_id, "Committing queue");
        self.queues.insert(self.queue_id.clone(), queue.clone());
        self.current = Some(queue);
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl QueueStore for InMemoryQueueStore {
    async fn get(&self, id: &str) -> Result<Option<Queue>> {
        Ok(self.queues.get(id).map(|entry| entry.value().clone()))
    }

    async fn lock(&self, id: &str) -> Result<Box<dyn QueueGuard>> {
        let lock = self.locks.acquire(id).await?;
        let current = self.queues.get(id).map(|entry| entry.value().clone());

        Ok(Box::new(MemoryGuard {
            queue_id: id.to_string(),
            current,
            queues: Arc::clone(&self.queues),
            _lock: lock,
        }))
    }
}

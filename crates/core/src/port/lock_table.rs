// Per-queue lock table shared by the store adapters

use crate::error::{AppError, Result};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slots = DashMap<String, Arc<Mutex<()>>>;
use tracing::warn;

/// Default time a caller waits for a queue lock before giving up
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// One fair async mutex per queue id
///
/// Slots live in a sharded map, so taking the lock of one queue never blocks
/// operations on another. tokio's `Mutex` hands the lock out in FIFO order.
/// A slot exists only while someone holds or waits for it.
pub struct QueueLockTable {
    slots: Arc<Slots>,
    timeout: Duration,
}

/// Held lock on one queue id; unlocks on drop
#[derive(Debug)]
pub struct QueueLock {
    id: String,
    slots: Arc<Slots>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for QueueLock {
    fn drop(&mut self) {
        // Unlock first so the slot's only remaining owner is the map
        self.guard.take();
        evict_idle(&self.slots, &self.id);
    }
}

/// Drop the slot for `id` if nobody holds or waits for it
///
/// Acquirers clone the slot under the same shard lock `remove_if` takes, so
/// a count of one means no other task can reach this mutex.
fn evict_idle(slots: &Slots, id: &str) {
    slots.remove_if(id, |_, slot| Arc::strong_count(slot) == 1);
}

impl QueueLockTable {
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Acquire the lock for `id`, or fail with `Busy` after the timeout
    pub async fn acquire(&self, id: &str) -> Result<QueueLock> {
        // The map shard guard must be gone before awaiting
        let slot = Arc::clone(self.slots.entry(id.to_string()).or_default().value());

        match tokio::time::timeout(self.timeout, slot.lock_owned()).await {
            Ok(guard) => Ok(QueueLock {
                id: id.to_string(),
                slots: Arc::clone(&self.slots),
                guard: Some(guard),
            }),
            Err(_) => {
                evict_idle(&self.slots, id);
                warn!(
                    queue_id = %id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Timed out waiting for queue lock"
                );
                Err(AppError::Busy(format!(
                    "queue {} is busy, retry later",
                    id
                )))
            }
        }
    }

    /// Number of queue ids currently held or waited on
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for QueueLockTable {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_id_times_out_as_busy() {
        let table = QueueLockTable::new(Duration::from_millis(50));
        let _held = table.acquire("q1").await.unwrap();

        let err = table.acquire("q1").await.unwrap_err();
        assert!(matches!(err, AppError::Busy(_)));
    }

    #[tokio::test]
    async fn test_different_ids_are_independent() {
        let table = QueueLockTable::new(Duration::from_millis(50));
        let _q1 = table.acquire("q1").await.unwrap();
        let _q2 = table.acquire("q2").await.unwrap();
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn test_released_slots_are_evicted() {
        let table = QueueLockTable::new(Duration::from_millis(50));
        for i in 0..10_000 {
            drop(table.acquire(&format!("missing-{}", i)).await.unwrap());
        }
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_slot_survives_while_a_waiter_is_queued() {
        let table = Arc::new(QueueLockTable::new(Duration::from_secs(5)));
        let held = table.acquire("q1").await.unwrap();

        let waiter = {
            let table = Arc::clone(&table);
            tokio::spawn(async move { table.acquire("q1").await.map(drop) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);
        assert_eq!(table.len(), 1);

        waiter.await.unwrap().unwrap();
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_timed_out_waiter_leaves_no_slot_behind() {
        let table = QueueLockTable::new(Duration::from_millis(20));
        let held = table.acquire("q1").await.unwrap();
        assert!(table.acquire("q1").await.is_err());
        drop(held);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_lock_is_reusable_after_drop() {
        let table = QueueLockTable::new(Duration::from_millis(50));
        drop(table.acquire("q1").await.unwrap());
        assert!(table.acquire("q1").await.is_ok());
    }

    #[tokio::test]
    async fn test_waiters_are_served_in_order() {
        let table = Arc::new(QueueLockTable::new(Duration::from_secs(5)));
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        let held = table.acquire("q1").await.unwrap();
        let mut handles = Vec::new();
        for i in 0..5 {
            let table = Arc::clone(&table);
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                let _guard = table.acquire("q1").await.unwrap();
                order.lock().unwrap().push(i);
            }));
            // Let each waiter enqueue before spawning the next
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        drop(held);

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }
}

//! Shared wiring for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use waitline_core::application::{QueueEngine, QueueEventHub};
use waitline_core::port::id_provider::UuidProvider;
use waitline_core::port::time_provider::SystemTimeProvider;
use waitline_core::port::QueueStore;
use waitline_infra_memory::InMemoryQueueStore;
use waitline_infra_sqlite::{create_pool, run_migrations, SqliteQueueStore};

pub const LOCK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy)]
pub enum Backend {
    Memory,
    Sqlite,
}

pub const BACKENDS: [Backend; 2] = [Backend::Memory, Backend::Sqlite];

pub async fn store(backend: Backend) -> Arc<dyn QueueStore> {
    match backend {
        Backend::Memory => Arc::new(InMemoryQueueStore::new(LOCK_TIMEOUT)),
        Backend::Sqlite => {
            let pool = create_pool(":memory:").await.unwrap();
            run_migrations(&pool).await.unwrap();
            Arc::new(SqliteQueueStore::new(pool, LOCK_TIMEOUT))
        }
    }
}

pub fn engine_on(store: Arc<dyn QueueStore>, events: Arc<QueueEventHub>) -> Arc<QueueEngine> {
    Arc::new(QueueEngine::new(
        store,
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
        events,
    ))
}

pub async fn engine(backend: Backend) -> Arc<QueueEngine> {
    engine_on(store(backend).await, Arc::new(QueueEventHub::default()))
}

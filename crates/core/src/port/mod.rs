// Port Layer - Interfaces for external dependencies

pub mod event_publisher;
pub mod id_provider; // For deterministic testing
pub mod lock_table;
pub mod queue_store;
pub mod time_provider;

// Re-exports
pub use event_publisher::{EventPublisher, NoopPublisher};
pub use id_provider::IdProvider;
pub use lock_table::{QueueLock, QueueLockTable};
pub use queue_store::{with_lock, with_lock_notify, LockOutcome, QueueGuard, QueueStore};
pub use time_provider::TimeProvider;

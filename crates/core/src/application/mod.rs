// Application Layer - Use Cases and Business Logic

pub mod events;
pub mod queue_engine;

// Re-exports
pub use events::{QueueEventHub, QueueSubscription};
pub use queue_engine::{CallNextOutcome, EndOutcome, JoinOutcome, JoinRequest, QueueEngine};

// Domain Layer - Pure business logic and entities

pub mod error;
pub mod event;
pub mod queue;

// Re-exports
pub use error::DomainError;
pub use event::{QueueEvent, QueueEventKind, RemovalReason};
pub use queue::{
    NewQueue, Person, PersonId, PositionedPerson, Queue, QueueId, QueueSnapshot, MAX_NAME_LEN,
    MAX_TEXT_LEN,
};

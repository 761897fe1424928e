// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("Queue {0} is closed")]
    QueueClosed(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;

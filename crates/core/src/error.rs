// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
///
/// Every failure kind the boundary must tell apart has its own variant.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// True when the queue refused a mutation because it has been ended
    pub fn is_queue_closed(&self) -> bool {
        matches!(
            self,
            AppError::Domain(crate::domain::DomainError::QueueClosed(_))
        )
    }

    /// True for malformed input, whether raised by the domain or the engine
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::Domain(crate::domain::DomainError::Validation(_))
        )
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in infra-sqlite crate
// by converting to AppError::Database(String)

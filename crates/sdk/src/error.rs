//! SDK Error Types

use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// Error codes sent by the daemon
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const QUEUE_CLOSED: i32 = 4004;
    pub const BUSY: i32 = 4005;
    pub const UNAUTHORIZED: i32 = 4010;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
}

/// SDK Error
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("RPC error ({code}): {message}")]
    Rpc { code: i32, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Not in a queue")]
    NotJoined,

    #[error("Other error: {0}")]
    Other(String),
}

impl SdkError {
    /// Daemon error code, if the daemon answered at all
    pub fn code(&self) -> Option<i32> {
        match self {
            SdkError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(code::NOT_FOUND)
    }

    pub fn is_queue_closed(&self) -> bool {
        self.code() == Some(code::QUEUE_CLOSED)
    }

    pub fn is_validation(&self) -> bool {
        self.code() == Some(code::VALIDATION_ERROR)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.code() == Some(code::UNAUTHORIZED)
    }

    /// Lock timeout or transport hiccup; the call may be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, SdkError::Transport(_) | SdkError::Connection(_))
            || self.code() == Some(code::BUSY)
    }
}

impl From<jsonrpsee::core::ClientError> for SdkError {
    fn from(e: jsonrpsee::core::ClientError) -> Self {
        match e {
            jsonrpsee::core::ClientError::Call(call_err) => SdkError::Rpc {
                code: call_err.code(),
                message: call_err.message().to_string(),
            },
            jsonrpsee::core::ClientError::Transport(e) => {
                SdkError::Transport(format!("Transport error: {}", e))
            }
            jsonrpsee::core::ClientError::RestartNeeded(_) => {
                SdkError::Connection("Connection restart needed".to_string())
            }
            jsonrpsee::core::ClientError::ParseError(e) => SdkError::Serialization(e),
            _ => SdkError::Other(e.to_string()),
        }
    }
}

//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes. Every error kind keeps
//! its own code so clients can tell them apart.

use jsonrpsee::types::ErrorObjectOwned;
use waitline_core::domain::DomainError;
use waitline_core::error::AppError;

/// RPC Error Codes
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

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Validation(msg) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, msg, None::<()>)
        }
        AppError::Domain(DomainError::Validation(msg)) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, msg, None::<()>)
        }
        AppError::Domain(e @ DomainError::QueueClosed(_)) => {
            ErrorObjectOwned::owned(code::QUEUE_CLOSED, e.to_string(), None::<()>)
        }
        AppError::NotFound(msg) => ErrorObjectOwned::owned(code::NOT_FOUND, msg, None::<()>),
        AppError::Conflict(msg) => ErrorObjectOwned::owned(code::CONFLICT, msg, None::<()>),
        AppError::Busy(msg) => ErrorObjectOwned::owned(code::BUSY, msg, None::<()>),
        AppError::Unauthorized(msg) => {
            ErrorObjectOwned::owned(code::UNAUTHORIZED, msg, None::<()>)
        }
        AppError::Database(msg) => ErrorObjectOwned::owned(code::DB_ERROR, msg, None::<()>),
        AppError::Config(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
        AppError::Internal(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
    }
}

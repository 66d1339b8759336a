//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use waitline_core::domain::DomainError;
use waitline_core::error::AppError;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const THROTTLED: i32 = 4003;
    pub const BUSY: i32 = 4004;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Domain(e) => domain_to_rpc_error(e),
        AppError::Validation(msg) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, msg, None::<()>)
        }
        AppError::Busy(msg) => ErrorObjectOwned::owned(code::BUSY, msg, None::<()>),
        AppError::Database(msg) => ErrorObjectOwned::owned(code::DB_ERROR, msg, None::<()>),
        AppError::Io(e) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, e.to_string(), None::<()>),
        AppError::Serialization(e) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, e.to_string(), None::<()>)
        }
        AppError::Config(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
        AppError::Internal(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
    }
}

/// Domain errors split into not-found, conflict and validation buckets
fn domain_to_rpc_error(err: DomainError) -> ErrorObjectOwned {
    let code = match &err {
        DomainError::QueueNotFound(_)
        | DomainError::EntryNotFound(_)
        | DomainError::PersonNotFound(_) => code::NOT_FOUND,

        DomainError::QueueInactive(_, _)
        | DomainError::QueueAtCapacity { .. }
        | DomainError::NoOneWaiting(_)
        | DomainError::OwnerCannotJoinOwnQueue
        | DomainError::WrongQueue { .. }
        | DomainError::AlreadyTerminal { .. }
        | DomainError::InvalidTransition { .. } => code::CONFLICT,

        DomainError::InvalidPartySize { .. } | DomainError::ValidationError(_) => {
            code::VALIDATION_ERROR
        }
    };
    ErrorObjectOwned::owned(code, err.to_string(), None::<()>)
}

/// Standard throttling error for rate-limited methods
pub fn throttled() -> ErrorObjectOwned {
    ErrorObjectOwned::owned(
        code::THROTTLED,
        "Rate limit exceeded. Please slow down.",
        None::<()>,
    )
}

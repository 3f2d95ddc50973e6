//! API Error Types
//!
//! Errors surfaced by the HTTP layer. Per-connection failures never reach
//! this type; the only fatal condition is failing to bind the listener.

use thiserror::Error;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// IO error (bind/listen failure)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

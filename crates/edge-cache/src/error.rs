//! Cache error types.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache operation errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backend storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Stored entry could not be interpreted.
    #[error("corrupt cache entry for {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// Component could not be built from configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<CacheError> for edge_core::EdgeError {
    fn from(err: CacheError) -> Self {
        edge_core::EdgeError::InternalError(err.to_string())
    }
}

//! Errors raised while talking to the host platform

use thiserror::Error;

use crate::storage::StorageError;

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;

/// Host errors
#[derive(Debug, Error)]
pub enum HostError {
    #[error("request to host failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("host returned {status} for {path}: {message}")]
    Status {
        status: u16,
        path: String,
        message: String,
    },

    #[error("failed to read host registry: {0}")]
    Storage(#[from] StorageError),
}

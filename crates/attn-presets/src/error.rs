//! Storage error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The write would exceed the store's capacity.
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored bytes are not what the reader expects.
    #[error("Corrupted storage: {0}")]
    Corrupted(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

//! Error types for local cache operations.

use std::io;
use thiserror::Error;

/// Result type for local cache operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading or writing the local cache.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The cache refused or failed to replace its contents.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// The cache is closed.
    #[error("cache is closed")]
    Closed,
}

impl StorageError {
    /// Create a write failure.
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed(message.into())
    }
}

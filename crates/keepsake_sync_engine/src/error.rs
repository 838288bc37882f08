//! Error types for the sync engine.

use crate::remote::AccountStatus;
use keepsake_codec::CodecError;
use keepsake_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// The engine absorbs all of these internally; they surface only through
/// [`RemoteStore`](crate::RemoteStore) implementations and construction.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or remote store error.
    #[error("remote error: {message}")]
    Remote {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The remote account cannot be used.
    #[error("remote account unavailable: {0}")]
    AccountUnavailable(AccountStatus),

    /// The requested record or subscription does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Local cache error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// I/O error outside the cache, such as spawning the dispatcher.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A remote call exceeded the request timeout.
    #[error("operation timed out")]
    Timeout,
}

impl SyncError {
    /// Creates a retryable remote error.
    pub fn remote_retryable(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
            retryable: true,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote { retryable, .. } => *retryable,
            SyncError::AccountUnavailable(status) => status.is_transient(),
            SyncError::Timeout => true,
            _ => false,
        }
    }

    /// Returns true if this error means the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }
}

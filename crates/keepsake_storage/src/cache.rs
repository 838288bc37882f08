//! Local cache trait definition.

use crate::error::StorageResult;

/// A single-slot local cache for encoded envelopes.
///
/// Caches are **opaque byte stores**. They hold the most recently written
/// envelope and hand it back on read; they never interpret it.
///
/// # Invariants
///
/// - `write_atomic` either fully replaces the contents or leaves the
///   previous contents intact
/// - `read` returns exactly the bytes of the last successful write
/// - A cache that has never been written reads as `None`
///
/// Methods block. Async callers run them on a blocking thread.
///
/// # Implementors
///
/// - [`super::FileCache`] - For persistent storage
/// - [`super::InMemoryCache`] - For testing
pub trait LocalCache: Send + Sync {
    /// Reads the cached bytes, or `None` if nothing has been stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache exists but cannot be read.
    fn read(&self) -> StorageResult<Option<Vec<u8>>>;

    /// Replaces the cached bytes atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the new contents could not be made durable. The
    /// previous contents are left in place.
    fn write_atomic(&self, bytes: &[u8]) -> StorageResult<()>;

    /// Asks the platform to leave the cache out of device backups.
    ///
    /// The default implementation does nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the request.
    fn exclude_from_backup(&self) -> StorageResult<()> {
        Ok(())
    }
}

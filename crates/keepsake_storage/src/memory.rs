//! In-memory cache for testing.

use crate::cache::LocalCache;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// An in-memory local cache.
///
/// This cache keeps its single slot in memory and is suitable for:
/// - Unit tests
/// - Integration tests that inject storage failures
/// - Ephemeral engines that don't need persistence
///
/// # Example
///
/// ```rust
/// use keepsake_storage::{InMemoryCache, LocalCache};
///
/// let cache = InMemoryCache::new();
/// cache.write_atomic(b"test data").unwrap();
/// assert_eq!(cache.read().unwrap().unwrap(), b"test data");
/// assert_eq!(cache.write_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryCache {
    slot: RwLock<Option<Vec<u8>>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    closed: AtomicBool,
    backup_excluded: AtomicBool,
}

impl InMemoryCache {
    /// Creates a new empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache holding pre-existing bytes.
    ///
    /// Useful for testing load scenarios.
    #[must_use]
    pub fn with_data(bytes: Vec<u8>) -> Self {
        Self {
            slot: RwLock::new(Some(bytes)),
            ..Self::default()
        }
    }

    /// Returns a copy of the stored bytes.
    #[must_use]
    pub fn data(&self) -> Option<Vec<u8>> {
        self.slot.read().clone()
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Acquire)
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Closes the cache; every later call fails with [`StorageError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Returns true once [`LocalCache::exclude_from_backup`] has been requested.
    pub fn is_backup_excluded(&self) -> bool {
        self.backup_excluded.load(Ordering::Acquire)
    }

    fn check_open(&self) -> StorageResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl LocalCache for InMemoryCache {
    fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        self.check_open()?;
        Ok(self.slot.read().clone())
    }

    fn write_atomic(&self, bytes: &[u8]) -> StorageResult<()> {
        self.check_open()?;
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(StorageError::write_failed("writes disabled"));
        }
        *self.slot.write() = Some(bytes.to_vec());
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn exclude_from_backup(&self) -> StorageResult<()> {
        self.check_open()?;
        self.backup_excluded.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_reads_none() {
        let cache = InMemoryCache::new();
        assert!(cache.read().unwrap().is_none());
        assert_eq!(cache.write_count(), 0);
    }

    #[test]
    fn write_replaces_slot() {
        let cache = InMemoryCache::with_data(b"old".to_vec());
        cache.write_atomic(b"new").unwrap();
        assert_eq!(cache.data().unwrap(), b"new");
        assert_eq!(cache.write_count(), 1);
    }

    #[test]
    fn failed_writes_leave_data() {
        let cache = InMemoryCache::with_data(b"old".to_vec());
        cache.set_fail_writes(true);
        assert!(matches!(
            cache.write_atomic(b"new"),
            Err(StorageError::WriteFailed(_))
        ));
        assert_eq!(cache.data().unwrap(), b"old");
        assert_eq!(cache.write_count(), 0);

        cache.set_fail_writes(false);
        cache.write_atomic(b"new").unwrap();
        assert_eq!(cache.data().unwrap(), b"new");
    }

    #[test]
    fn closed_cache_rejects_everything() {
        let cache = InMemoryCache::new();
        cache.close();
        assert!(matches!(cache.read(), Err(StorageError::Closed)));
        assert!(matches!(cache.write_atomic(b"x"), Err(StorageError::Closed)));
        assert!(matches!(
            cache.exclude_from_backup(),
            Err(StorageError::Closed)
        ));
    }
}

//! File-based cache for persistent storage.

use crate::cache::LocalCache;
use crate::error::StorageResult;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// A file-based local cache.
///
/// The cache lives in a single file. Writes go to a sibling temporary file
/// which is synced and then renamed over the target, so readers see either
/// the old or the new contents, never a torn write.
///
/// # Example
///
/// ```no_run
/// use keepsake_storage::{FileCache, LocalCache};
///
/// let cache = FileCache::in_dir("/var/lib/app", &FileCache::default_file_name("Model"));
/// cache.write_atomic(b"envelope").unwrap();
/// assert_eq!(cache.read().unwrap().as_deref(), Some(&b"envelope"[..]));
/// ```
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    write_lock: Mutex<()>,
    backup_excluded: AtomicBool,
}

impl FileCache {
    /// Creates a cache backed by the file at `path`.
    ///
    /// Nothing is touched on disk until the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            backup_excluded: AtomicBool::new(false),
        }
    }

    /// Creates a cache for the file `name` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>, name: &str) -> Self {
        Self::new(dir.as_ref().join(name))
    }

    /// File name used for a record type.
    ///
    /// Debug builds use a separate file so development runs never clobber
    /// release data.
    #[must_use]
    pub fn default_file_name(record_type: &str) -> String {
        if cfg!(debug_assertions) {
            format!("{record_type}.debug.data")
        } else {
            format!("{record_type}.data")
        }
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true once [`LocalCache::exclude_from_backup`] has been requested.
    pub fn is_backup_excluded(&self) -> bool {
        self.backup_excluded.load(Ordering::Acquire)
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!(".{name}.tmp"))
    }
}

impl LocalCache for FileCache {
    fn read(&self) -> StorageResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                trace!(path = %self.path.display(), bytes = bytes.len(), "cache read");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_atomic(&self, bytes: &[u8]) -> StorageResult<()> {
        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        let result = (|| -> io::Result<()> {
            let mut file = File::create(&temp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)
        })();

        if let Err(e) = result {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        debug!(path = %self.path.display(), bytes = bytes.len(), "cache written");
        Ok(())
    }

    fn exclude_from_backup(&self) -> StorageResult<()> {
        // only Apple platforms have a per-file backup flag
        self.backup_excluded.store(true, Ordering::Release);
        trace!(path = %self.path.display(), "backup exclusion requested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_none() {
        let dir = tempdir().unwrap();
        let cache = FileCache::in_dir(dir.path(), "Model.data");
        assert!(cache.read().unwrap().is_none());
        assert!(!cache.path().exists());
    }

    #[test]
    fn write_then_read() {
        let dir = tempdir().unwrap();
        let cache = FileCache::in_dir(dir.path(), "Model.data");

        cache.write_atomic(b"first").unwrap();
        assert_eq!(cache.read().unwrap().unwrap(), b"first");

        cache.write_atomic(b"second, longer").unwrap();
        assert_eq!(cache.read().unwrap().unwrap(), b"second, longer");
    }

    #[test]
    fn write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("a").join("b").join("Model.data"));
        cache.write_atomic(b"nested").unwrap();
        assert_eq!(cache.read().unwrap().unwrap(), b"nested");
    }

    #[test]
    fn no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let cache = FileCache::in_dir(dir.path(), "Model.data");
        cache.write_atomic(b"data").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["Model.data".to_string()]);
    }

    #[test]
    fn failed_write_keeps_previous_contents() {
        let dir = tempdir().unwrap();
        let cache = FileCache::in_dir(dir.path(), "Model.data");
        cache.write_atomic(b"keep me").unwrap();

        // a directory where the temp file should go makes File::create fail
        fs::create_dir(dir.path().join(".Model.data.tmp")).unwrap();
        assert!(cache.write_atomic(b"lost").is_err());
        assert_eq!(cache.read().unwrap().unwrap(), b"keep me");
    }

    #[test]
    fn file_name_follows_build_profile() {
        let name = FileCache::default_file_name("Model");
        if cfg!(debug_assertions) {
            assert_eq!(name, "Model.debug.data");
        } else {
            assert_eq!(name, "Model.data");
        }
    }

    #[test]
    fn backup_exclusion_recorded() {
        let dir = tempdir().unwrap();
        let cache = FileCache::in_dir(dir.path(), "Model.data");
        assert!(!cache.is_backup_excluded());
        cache.exclude_from_backup().unwrap();
        assert!(cache.is_backup_excluded());
    }
}

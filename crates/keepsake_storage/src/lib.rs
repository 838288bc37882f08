//! # Keepsake Storage
//!
//! Local cache adapters for Keepsake.
//!
//! A local cache holds exactly one encoded envelope: the last state the
//! engine persisted. Caches are **opaque byte stores** - they do not
//! interpret the data they store.
//!
//! ## Design Principles
//!
//! - One slot: read the whole thing, replace the whole thing
//! - Replacement is atomic; a failed write leaves the old contents
//! - Blocking API, `Send + Sync`, safe to call from any thread
//!
//! ## Available Caches
//!
//! - [`FileCache`] - Persistent storage using temp file + rename
//! - [`InMemoryCache`] - For testing and ephemeral engines
//!
//! ## Example
//!
//! ```rust
//! use keepsake_storage::{InMemoryCache, LocalCache};
//!
//! let cache = InMemoryCache::new();
//! assert!(cache.read().unwrap().is_none());
//! cache.write_atomic(b"hello world").unwrap();
//! assert_eq!(cache.read().unwrap().unwrap(), b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod error;
mod file;
mod memory;

pub use cache::LocalCache;
pub use error::{StorageError, StorageResult};
pub use file::FileCache;
pub use memory::InMemoryCache;

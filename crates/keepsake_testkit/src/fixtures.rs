//! Archive fixtures and cache helpers.
//!
//! [`Counter`] has two historical layouts so migration paths can be tested
//! end to end; [`legacy`] forges envelopes in those layouts.

use keepsake_codec::{
    Archive, CodecResult, Envelope, MigrationTable, Reader, Width, Writer,
};
use keepsake_storage::FileCache;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use uuid::Uuid;

/// A counter document at schema version 3.
///
/// Layout history:
/// - v1: `count: u32`
/// - v2: `count: u64`, `label` with a `u8` prefix
/// - v3: `count: u64`, `label` with a `u16` prefix, `tags`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counter {
    /// Current count.
    pub count: u64,
    /// Display label.
    pub label: String,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Logical timestamp.
    pub timestamp: u32,
}

impl Counter {
    /// Creates a counter with the given count and timestamp.
    pub fn new(count: u64, timestamp: u32) -> Self {
        Self {
            count,
            timestamp,
            ..Self::default()
        }
    }

    /// Sets the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Encodes this counter at the current version.
    ///
    /// # Errors
    ///
    /// Returns an error if a field overflows its length prefix.
    pub fn to_bytes(&self) -> CodecResult<Vec<u8>> {
        Envelope::new(self.clone()).encode()
    }
}

impl Archive for Counter {
    const VERSION: u8 = 3;

    fn timestamp(&self) -> u32 {
        self.timestamp
    }

    fn set_timestamp(&mut self, timestamp: u32) {
        self.timestamp = timestamp;
    }

    fn write_payload(&self, writer: &mut Writer) -> CodecResult<()> {
        writer
            .put_u64(self.count)
            .put_str(Width::U16, &self.label)?
            .put_strings(Width::U8, Width::U16, &self.tags)?;
        Ok(())
    }

    fn read_payload(reader: &mut Reader<'_>) -> CodecResult<Self> {
        Ok(Self {
            count: reader.u64()?,
            label: reader.string(Width::U16)?,
            tags: reader.strings(Width::U8, Width::U16)?,
            timestamp: 0,
        })
    }

    fn migrations() -> MigrationTable<Self> {
        MigrationTable::new()
            .with(1, counter_from_v1)
            .with(2, counter_from_v2)
    }
}

fn counter_from_v1(reader: &mut Reader<'_>) -> CodecResult<Counter> {
    Ok(Counter {
        count: u64::from(reader.u32()?),
        ..Counter::default()
    })
}

fn counter_from_v2(reader: &mut Reader<'_>) -> CodecResult<Counter> {
    Ok(Counter {
        count: reader.u64()?,
        label: reader.string(Width::U8)?,
        ..Counter::default()
    })
}

/// Encoders for historical [`Counter`] layouts.
pub mod legacy {
    use keepsake_codec::{CodecResult, Format, RawEnvelope, Width, Writer};

    /// Payload bytes of a v1 counter.
    pub fn counter_v1_payload(count: u32) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.put_u32(count);
        writer.into_bytes()
    }

    /// Payload bytes of a v2 counter.
    ///
    /// # Errors
    ///
    /// Returns an error if `label` is longer than 255 bytes.
    pub fn counter_v2_payload(count: u64, label: &str) -> CodecResult<Vec<u8>> {
        let mut writer = Writer::new();
        writer.put_u64(count).put_str(Width::U8, label)?;
        Ok(writer.into_bytes())
    }

    /// A complete compressed envelope as written by v1.
    ///
    /// # Errors
    ///
    /// Returns an error if compression fails.
    pub fn counter_v1(count: u32, timestamp: u32) -> CodecResult<Vec<u8>> {
        RawEnvelope::new(1, timestamp, counter_v1_payload(count)).encode()
    }

    /// A complete compressed envelope as written by v2.
    ///
    /// # Errors
    ///
    /// Returns an error if `label` is too long or compression fails.
    pub fn counter_v2(count: u64, label: &str, timestamp: u32) -> CodecResult<Vec<u8>> {
        RawEnvelope::new(2, timestamp, counter_v2_payload(count, label)?).encode()
    }

    /// A v2 envelope in the uncompressed magic-prefixed layout.
    ///
    /// # Errors
    ///
    /// See [`counter_v2`].
    pub fn counter_v2_framed(
        count: u64,
        label: &str,
        timestamp: u32,
        firmware: u8,
    ) -> CodecResult<Vec<u8>> {
        RawEnvelope::new(2, timestamp, counter_v2_payload(count, label)?)
            .encode_as(Format::Framed { firmware })
    }
}

/// A note document with no migration history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Note {
    /// Stable identifier.
    pub id: Uuid,
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Pinned to the top.
    pub pinned: bool,
    /// Logical timestamp.
    pub timestamp: u32,
}

impl Note {
    /// Creates an unpinned note with a fresh id.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            body: body.into(),
            pinned: false,
            timestamp: 0,
        }
    }
}

impl Archive for Note {
    const VERSION: u8 = 1;

    fn timestamp(&self) -> u32 {
        self.timestamp
    }

    fn set_timestamp(&mut self, timestamp: u32) {
        self.timestamp = timestamp;
    }

    fn write_payload(&self, writer: &mut Writer) -> CodecResult<()> {
        writer
            .put_uuid(&self.id)
            .put_str(Width::U16, &self.title)?
            .put_str(Width::U32, &self.body)?
            .put_bool(self.pinned);
        Ok(())
    }

    fn read_payload(reader: &mut Reader<'_>) -> CodecResult<Self> {
        Ok(Self {
            id: reader.uuid()?,
            title: reader.string(Width::U16)?,
            body: reader.string(Width::U32)?,
            pinned: reader.bool()?,
            timestamp: 0,
        })
    }
}

/// A temporary directory for file caches, removed on drop.
pub struct TempCacheDir {
    dir: TempDir,
}

impl TempCacheDir {
    /// Creates a fresh directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// The directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// A file cache named after `record_type` inside the directory.
    pub fn cache(&self, record_type: &str) -> FileCache {
        FileCache::in_dir(self.dir.path(), &FileCache::default_file_name(record_type))
    }
}

impl Default for TempCacheDir {
    fn default() -> Self {
        Self::new()
    }
}

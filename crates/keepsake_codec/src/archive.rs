//! Typed, versioned envelopes.
//!
//! An [`Archive`] is the application document. It knows how to write its
//! current layout and read it back; older layouts are handled by a
//! [`MigrationTable`] indexed by schema version.

use crate::clock::unix_now;
use crate::envelope::{Format, RawEnvelope};
use crate::error::{CodecError, CodecResult};
use crate::reader::Reader;
use crate::writer::Writer;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// A synchronized document.
///
/// `Default` must produce the application's zero value with timestamp 0.
/// The timestamp is carried by the envelope, so `write_payload` and
/// `read_payload` deal with the remaining fields only.
pub trait Archive: Default + Clone + Send + Sync + 'static {
    /// Schema version of the layout written by [`write_payload`](Self::write_payload).
    const VERSION: u8;

    /// Logical timestamp in seconds.
    fn timestamp(&self) -> u32;

    /// Replaces the logical timestamp.
    fn set_timestamp(&mut self, timestamp: u32);

    /// Writes the current layout.
    fn write_payload(&self, writer: &mut Writer) -> CodecResult<()>;

    /// Reads the current layout.
    fn read_payload(reader: &mut Reader<'_>) -> CodecResult<Self>;

    /// Readers for layouts written by earlier schema versions.
    fn migrations() -> MigrationTable<Self> {
        MigrationTable::new()
    }
}

/// Reads a historical payload layout into the current shape.
pub type Migration<A> = fn(&mut Reader<'_>) -> CodecResult<A>;

/// Version-indexed table of payload migrations.
pub struct MigrationTable<A> {
    steps: BTreeMap<u8, Migration<A>>,
}

impl<A> MigrationTable<A> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            steps: BTreeMap::new(),
        }
    }

    /// Registers the reader for `version`, replacing any previous one.
    #[must_use]
    pub fn with(mut self, version: u8, migration: Migration<A>) -> Self {
        self.steps.insert(version, migration);
        self
    }

    /// Returns the reader registered for `version`.
    pub fn get(&self, version: u8) -> Option<Migration<A>> {
        self.steps.get(&version).copied()
    }

    /// Versions with a registered reader, ascending.
    pub fn versions(&self) -> Vec<u8> {
        self.steps.keys().copied().collect()
    }

    /// Returns true if no migration is registered.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<A: Archive> MigrationTable<A> {
    /// Reads `payload`, written by `version`, into the current shape.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedVersion`] if nothing is registered
    /// for `version`, or the migration's own error.
    pub fn migrate(&self, version: u8, payload: &[u8]) -> CodecResult<A> {
        let step = self.get(version).ok_or(CodecError::UnsupportedVersion {
            found: version,
            current: A::VERSION,
        })?;
        step(&mut Reader::new(payload))
    }
}

impl<A> Default for MigrationTable<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> fmt::Debug for MigrationTable<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationTable")
            .field("versions", &self.versions())
            .finish()
    }
}

/// A decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<A> {
    /// Schema version of `payload`'s layout.
    pub version: u8,
    /// Logical timestamp in seconds.
    pub timestamp: u32,
    /// The document, stamped with `timestamp`.
    pub payload: A,
    /// Version the bytes were written with, when a migration ran.
    pub migrated_from: Option<u8>,
}

impl<A: Archive> Envelope<A> {
    /// Wraps a document at the current schema version and its own timestamp.
    pub fn new(payload: A) -> Self {
        Self {
            version: A::VERSION,
            timestamp: payload.timestamp(),
            payload,
            migrated_from: None,
        }
    }

    /// Wraps a document with an explicit version tag and timestamp.
    ///
    /// The payload is always written in the current layout; tagging it with
    /// another version makes decoders route it through their migrations.
    pub fn with_version(mut payload: A, version: u8, timestamp: u32) -> Self {
        payload.set_timestamp(timestamp);
        Self {
            version,
            timestamp,
            payload,
            migrated_from: None,
        }
    }

    /// The envelope used when bytes cannot be decoded: current version,
    /// stamped now, default payload.
    pub fn fallback() -> Self {
        let now = unix_now();
        let mut payload = A::default();
        payload.set_timestamp(now);
        Self {
            version: A::VERSION,
            timestamp: now,
            payload,
            migrated_from: None,
        }
    }

    /// Serializes the payload into a raw envelope.
    ///
    /// # Errors
    ///
    /// Returns the payload writer's error.
    pub fn to_raw(&self) -> CodecResult<RawEnvelope> {
        let mut writer = Writer::new();
        self.payload.write_payload(&mut writer)?;
        Ok(RawEnvelope::new(
            self.version,
            self.timestamp,
            writer.into_bytes(),
        ))
    }

    /// Encodes to the compressed layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be written or compressed.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        self.to_raw()?.encode()
    }

    /// Encodes using the given layout.
    ///
    /// # Errors
    ///
    /// See [`encode`](Self::encode).
    pub fn encode_as(&self, format: Format) -> CodecResult<Vec<u8>> {
        self.to_raw()?.encode_as(format)
    }

    /// Interprets a raw envelope, migrating older layouts.
    ///
    /// The stored timestamp is kept as is, including after a migration.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnsupportedVersion`] when the version differs
    /// and no migration is registered, or the payload reader's error.
    pub fn from_raw(raw: RawEnvelope) -> CodecResult<Self> {
        let (mut payload, migrated_from) = if raw.version == A::VERSION {
            (A::read_payload(&mut Reader::new(&raw.payload))?, None)
        } else {
            (
                A::migrations().migrate(raw.version, &raw.payload)?,
                Some(raw.version),
            )
        };
        payload.set_timestamp(raw.timestamp);

        Ok(Self {
            version: A::VERSION,
            timestamp: raw.timestamp,
            payload,
            migrated_from,
        })
    }

    /// Decodes either layout, reporting failures.
    ///
    /// # Errors
    ///
    /// Returns an error for empty, corrupt or foreign bytes and for
    /// versions without a migration.
    pub fn try_decode(bytes: &[u8]) -> CodecResult<Self> {
        Self::from_raw(RawEnvelope::decode(bytes)?)
    }

    /// Decodes either layout. Never fails: anything undecodable yields
    /// [`fallback`](Self::fallback).
    pub fn decode(bytes: &[u8]) -> Self {
        match Self::try_decode(bytes) {
            Ok(envelope) => envelope,
            Err(error) if error.is_corrupt() => {
                warn!(%error, len = bytes.len(), "corrupt envelope, using default");
                Self::fallback()
            }
            Err(error) => {
                warn!(%error, len = bytes.len(), "unreadable schema, using default");
                Self::fallback()
            }
        }
    }

    /// Consumes the envelope, returning the document.
    pub fn into_payload(self) -> A {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Width;

    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    struct Profile {
        name: String,
        visits: u16,
        timestamp: u32,
    }

    impl Archive for Profile {
        const VERSION: u8 = 2;

        fn timestamp(&self) -> u32 {
            self.timestamp
        }

        fn set_timestamp(&mut self, timestamp: u32) {
            self.timestamp = timestamp;
        }

        fn write_payload(&self, writer: &mut Writer) -> CodecResult<()> {
            writer.put_str(Width::U16, &self.name)?.put_u16(self.visits);
            Ok(())
        }

        fn read_payload(reader: &mut Reader<'_>) -> CodecResult<Self> {
            Ok(Self {
                name: reader.string(Width::U16)?,
                visits: reader.u16()?,
                timestamp: 0,
            })
        }

        fn migrations() -> MigrationTable<Self> {
            // version 1 stored only the name, with a one-byte prefix
            MigrationTable::new().with(1, |reader| {
                Ok(Self {
                    name: reader.string(Width::U8)?,
                    ..Self::default()
                })
            })
        }
    }

    fn profile(name: &str, visits: u16, timestamp: u32) -> Profile {
        Profile {
            name: name.into(),
            visits,
            timestamp,
        }
    }

    #[test]
    fn roundtrip_current_version() {
        let envelope = Envelope::new(profile("ada", 3, 1234));
        let decoded = Envelope::<Profile>::try_decode(&envelope.encode().unwrap()).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.payload.timestamp, 1234);
    }

    #[test]
    fn migration_keeps_timestamp() {
        let mut writer = Writer::new();
        writer.put_str(Width::U8, "grace").unwrap();
        let bytes = RawEnvelope::new(1, 77, writer.into_bytes())
            .encode()
            .unwrap();

        let decoded = Envelope::<Profile>::try_decode(&bytes).unwrap();
        assert_eq!(decoded.version, 2);
        assert_eq!(decoded.migrated_from, Some(1));
        assert_eq!(decoded.timestamp, 77);
        assert_eq!(decoded.payload, profile("grace", 0, 77));
    }

    #[test]
    fn unknown_version_is_unsupported() {
        let bytes = RawEnvelope::new(9, 5, vec![]).encode().unwrap();
        assert_eq!(
            Envelope::<Profile>::try_decode(&bytes).unwrap_err(),
            CodecError::UnsupportedVersion {
                found: 9,
                current: 2
            }
        );
        assert!(!Envelope::<Profile>::try_decode(&bytes).unwrap_err().is_corrupt());
        assert_eq!(Envelope::<Profile>::decode(&bytes).payload.name, "");
    }

    #[test]
    fn decode_falls_back_on_garbage() {
        let before = unix_now();
        for bytes in [&[][..], &[0xde, 0xad, 0xbe, 0xef][..]] {
            let envelope = Envelope::<Profile>::decode(bytes);
            assert_eq!(envelope.version, Profile::VERSION);
            assert!(envelope.timestamp >= before);
            assert_eq!(envelope.payload.name, "");
            assert_eq!(envelope.payload.visits, 0);
            assert_eq!(envelope.payload.timestamp, envelope.timestamp);
        }
    }

    #[test]
    fn framed_layout_decodes() {
        let envelope = Envelope::new(profile("linus", 8, 99));
        let bytes = envelope.encode_as(Format::Framed { firmware: 0 }).unwrap();
        assert_eq!(Envelope::<Profile>::decode(&bytes), envelope);
    }

    #[test]
    fn migration_table_lookup() {
        let table = Profile::migrations();
        assert_eq!(table.versions(), vec![1]);
        assert!(table.get(1).is_some());
        assert!(table.get(2).is_none());
        assert!(!table.is_empty());
        assert!(format!("{table:?}").contains("[1]"));
    }
}

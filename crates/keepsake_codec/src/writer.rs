//! Little-endian byte writer.

use crate::error::{CodecError, CodecResult};
use uuid::Uuid;

/// Width of a length prefix.
///
/// Compound values (strings, blobs, collections) carry their length in
/// front of the data. The caller picks the width; reader and writer must
/// agree on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// One byte, lengths up to 255.
    U8,
    /// Two bytes, lengths up to 65 535.
    U16,
    /// Four bytes.
    U32,
    /// Eight bytes.
    U64,
}

impl Width {
    /// Number of bytes the prefix occupies.
    pub const fn bytes(self) -> usize {
        match self {
            Width::U8 => 1,
            Width::U16 => 2,
            Width::U32 => 4,
            Width::U64 => 8,
        }
    }

    /// Largest length the prefix can express.
    pub const fn max_len(self) -> u64 {
        match self {
            Width::U8 => u8::MAX as u64,
            Width::U16 => u16::MAX as u64,
            Width::U32 => u32::MAX as u64,
            Width::U64 => u64::MAX,
        }
    }
}

/// Types that can write themselves into a [`Writer`].
pub trait Encode {
    /// Append this value's bytes to the writer.
    fn encode(&self, writer: &mut Writer) -> CodecResult<()>;
}

/// An append-only byte buffer with fixed-width little-endian primitives.
///
/// Infallible writes return `&mut Self` so they can be chained; writes that
/// carry a length prefix return a `CodecResult` because the length may not
/// fit the chosen [`Width`].
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buffer: Vec<u8>,
}

impl Writer {
    /// Create a new writer.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new writer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Consume this writer and return the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the written bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Write a single byte.
    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    /// Write a `u16`.
    pub fn put_u16(&mut self, value: u16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a `u32`.
    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a `u64`.
    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a boolean as one byte.
    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.put_u8(u8::from(value))
    }

    /// Write a seconds-resolution timestamp.
    pub fn put_timestamp(&mut self, timestamp: u32) -> &mut Self {
        self.put_u32(timestamp)
    }

    /// Append bytes with no length prefix.
    pub fn put_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    /// Write a length-prefixed byte blob.
    pub fn put_bytes(&mut self, width: Width, bytes: &[u8]) -> CodecResult<&mut Self> {
        self.put_len(width, bytes.len())?;
        Ok(self.put_raw(bytes))
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn put_str(&mut self, width: Width, value: &str) -> CodecResult<&mut Self> {
        self.put_bytes(width, value.as_bytes())
    }

    /// Write a UUID as its upper-case hyphenated text with a one-byte prefix.
    pub fn put_uuid(&mut self, uuid: &Uuid) -> &mut Self {
        let mut buf = Uuid::encode_buffer();
        let text = uuid.hyphenated().encode_upper(&mut buf);
        // 36 bytes always fits a u8 prefix
        self.put_u8(text.len() as u8);
        self.put_raw(text.as_bytes())
    }

    /// Write any [`Encode`] value.
    pub fn put<E: Encode + ?Sized>(&mut self, value: &E) -> CodecResult<&mut Self> {
        value.encode(self)?;
        Ok(self)
    }

    /// Write a count-prefixed collection of [`Encode`] items.
    pub fn put_collection<E: Encode>(
        &mut self,
        width: Width,
        items: &[E],
    ) -> CodecResult<&mut Self> {
        self.put_len(width, items.len())?;
        for item in items {
            item.encode(self)?;
        }
        Ok(self)
    }

    /// Write a count-prefixed collection of length-prefixed strings.
    pub fn put_strings<S: AsRef<str>>(
        &mut self,
        count: Width,
        strings: Width,
        items: &[S],
    ) -> CodecResult<&mut Self> {
        self.put_len(count, items.len())?;
        for item in items {
            self.put_str(strings, item.as_ref())?;
        }
        Ok(self)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn put_len(&mut self, width: Width, len: usize) -> CodecResult<()> {
        if len as u64 > width.max_len() {
            return Err(CodecError::LengthOverflow {
                len,
                width: width.bytes(),
            });
        }
        match width {
            Width::U8 => self.put_u8(len as u8),
            Width::U16 => self.put_u16(len as u16),
            Width::U32 => self.put_u32(len as u32),
            Width::U64 => self.put_u64(len as u64),
        };
        Ok(())
    }
}

macro_rules! encode_primitive {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl Encode for $ty {
                fn encode(&self, writer: &mut Writer) -> CodecResult<()> {
                    writer.$method(*self);
                    Ok(())
                }
            }
        )*
    };
}

encode_primitive! {
    u8 => put_u8,
    u16 => put_u16,
    u32 => put_u32,
    u64 => put_u64,
    bool => put_bool,
}

impl Encode for Uuid {
    fn encode(&self, writer: &mut Writer) -> CodecResult<()> {
        writer.put_uuid(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_little_endian() {
        let mut writer = Writer::new();
        writer
            .put_u8(0x01)
            .put_u16(0x0203)
            .put_u32(0x0405_0607)
            .put_u64(0x0809_0a0b_0c0d_0e0f);

        assert_eq!(
            writer.as_bytes(),
            &[
                0x01, 0x03, 0x02, 0x07, 0x06, 0x05, 0x04, 0x0f, 0x0e, 0x0d, 0x0c, 0x0b, 0x0a,
                0x09, 0x08
            ]
        );
    }

    #[test]
    fn bool_encoding() {
        let mut writer = Writer::new();
        writer.put_bool(true).put_bool(false);
        assert_eq!(writer.as_bytes(), &[1, 0]);
    }

    #[test]
    fn string_prefix_widths() {
        let mut writer = Writer::new();
        writer.put_str(Width::U8, "hi").unwrap();
        assert_eq!(writer.as_bytes(), &[2, b'h', b'i']);

        let mut writer = Writer::new();
        writer.put_str(Width::U32, "hi").unwrap();
        assert_eq!(writer.as_bytes(), &[2, 0, 0, 0, b'h', b'i']);
    }

    #[test]
    fn length_overflow_is_an_error() {
        let long = "x".repeat(256);
        let mut writer = Writer::new();
        let err = writer.put_str(Width::U8, &long).unwrap_err();
        assert_eq!(err, CodecError::LengthOverflow { len: 256, width: 1 });
        assert!(writer.is_empty());
    }

    #[test]
    fn uuid_is_prefixed_text() {
        let uuid = Uuid::nil();
        let mut writer = Writer::new();
        writer.put_uuid(&uuid);
        assert_eq!(writer.len(), 37);
        assert_eq!(writer.as_bytes()[0], 36);
        assert_eq!(&writer.as_bytes()[1..9], b"00000000");
    }

    #[test]
    fn collection_prefix() {
        let mut writer = Writer::new();
        writer.put_collection(Width::U16, &[7u32, 9u32]).unwrap();
        assert_eq!(writer.as_bytes(), &[2, 0, 7, 0, 0, 0, 9, 0, 0, 0]);
    }
}

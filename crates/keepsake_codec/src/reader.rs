//! Little-endian byte reader.

use crate::error::{CodecError, CodecResult};
use crate::writer::Width;
use uuid::Uuid;

/// Types that can read themselves from a [`Reader`].
pub trait Decode: Sized {
    /// Read one value, advancing the reader.
    fn decode(reader: &mut Reader<'_>) -> CodecResult<Self>;
}

/// A cursor over a byte slice.
///
/// Every read is bounds checked; running off the end yields
/// [`CodecError::UnexpectedEof`] and leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Create a new reader for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Consume and return everything that is left.
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos.min(self.data.len())..];
        self.pos = self.data.len();
        rest
    }

    /// Read exactly `len` bytes.
    #[inline]
    pub fn take(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(CodecError::UnexpectedEof {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    #[inline]
    fn array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let bytes = self.take(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read one byte.
    pub fn u8(&mut self) -> CodecResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    /// Read a `u16`.
    pub fn u16(&mut self) -> CodecResult<u16> {
        self.array().map(u16::from_le_bytes)
    }

    /// Read a `u32`.
    pub fn u32(&mut self) -> CodecResult<u32> {
        self.array().map(u32::from_le_bytes)
    }

    /// Read a `u64`.
    pub fn u64(&mut self) -> CodecResult<u64> {
        self.array().map(u64::from_le_bytes)
    }

    /// Read a boolean. Only `1` is true.
    pub fn bool(&mut self) -> CodecResult<bool> {
        Ok(self.u8()? == 1)
    }

    /// Read a seconds-resolution timestamp.
    pub fn timestamp(&mut self) -> CodecResult<u32> {
        self.u32()
    }

    /// Read a length-prefixed byte blob.
    pub fn bytes(&mut self, width: Width) -> CodecResult<&'a [u8]> {
        let start = self.pos;
        let result = self.len(width).and_then(|len| self.take(len));
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn string(&mut self, width: Width) -> CodecResult<String> {
        let bytes = self.bytes(width)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    /// Read a UUID written by [`Writer::put_uuid`](crate::Writer::put_uuid).
    pub fn uuid(&mut self) -> CodecResult<Uuid> {
        let text = self.string(Width::U8)?;
        Uuid::parse_str(&text).map_err(|_| CodecError::InvalidUuid(text))
    }

    /// Read any [`Decode`] value.
    pub fn get<D: Decode>(&mut self) -> CodecResult<D> {
        D::decode(self)
    }

    /// Read a count-prefixed collection of [`Decode`] items.
    pub fn collection<D: Decode>(&mut self, width: Width) -> CodecResult<Vec<D>> {
        let count = self.count(width)?;
        // a hostile count must not drive the allocation
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            items.push(D::decode(self)?);
        }
        Ok(items)
    }

    /// Read a count-prefixed collection of length-prefixed strings.
    pub fn strings(&mut self, count: Width, strings: Width) -> CodecResult<Vec<String>> {
        let count = self.count(count)?;
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            items.push(self.string(strings)?);
        }
        Ok(items)
    }

    fn count(&mut self, width: Width) -> CodecResult<usize> {
        let raw = match width {
            Width::U8 => u64::from(self.u8()?),
            Width::U16 => u64::from(self.u16()?),
            Width::U32 => u64::from(self.u32()?),
            Width::U64 => self.u64()?,
        };
        usize::try_from(raw).map_err(|_| CodecError::invalid_payload("count exceeds usize"))
    }

    fn len(&mut self, width: Width) -> CodecResult<usize> {
        let len = self.count(width)?;
        if len > self.remaining() {
            return Err(CodecError::UnexpectedEof {
                needed: len,
                remaining: self.remaining(),
            });
        }
        Ok(len)
    }
}

macro_rules! decode_primitive {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl Decode for $ty {
                fn decode(reader: &mut Reader<'_>) -> CodecResult<Self> {
                    reader.$method()
                }
            }
        )*
    };
}

decode_primitive! {
    u8 => u8,
    u16 => u16,
    u32 => u32,
    u64 => u64,
    bool => bool,
}

impl Decode for Uuid {
    fn decode(reader: &mut Reader<'_>) -> CodecResult<Self> {
        reader.uuid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Writer;

    #[test]
    fn primitives_roundtrip() {
        let id = Uuid::new_v4();
        let mut writer = Writer::new();
        writer
            .put_u8(1)
            .put_u16(2)
            .put_u32(3)
            .put_u64(4)
            .put_bool(true)
            .put_bool(false)
            .put_timestamp(10)
            .put_uuid(&id);
        writer.put_bytes(Width::U8, &[1, 2, 3, 4, 5, 6]).unwrap();

        let bytes = writer.into_bytes();
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.u8().unwrap(), 1);
        assert_eq!(reader.u16().unwrap(), 2);
        assert_eq!(reader.u32().unwrap(), 3);
        assert_eq!(reader.u64().unwrap(), 4);
        assert!(reader.bool().unwrap());
        assert!(!reader.bool().unwrap());
        assert_eq!(reader.timestamp().unwrap(), 10);
        assert_eq!(reader.uuid().unwrap(), id);
        assert_eq!(reader.bytes(Width::U8).unwrap(), &[1, 2, 3, 4, 5, 6]);
        assert!(reader.is_empty());
    }

    #[test]
    fn string_roundtrip_each_width() {
        for width in [Width::U8, Width::U16, Width::U32, Width::U64] {
            let mut writer = Writer::new();
            writer.put_str(width, "hello world").unwrap();
            let bytes = writer.into_bytes();
            let mut reader = Reader::new(&bytes);
            assert_eq!(reader.string(width).unwrap(), "hello world");
            assert!(reader.is_empty());
        }
    }

    #[test]
    fn eof_reports_shortfall() {
        let mut reader = Reader::new(&[1, 2]);
        let err = reader.u32().unwrap_err();
        assert_eq!(
            err,
            CodecError::UnexpectedEof {
                needed: 4,
                remaining: 2
            }
        );
        // cursor untouched
        assert_eq!(reader.u16().unwrap(), 0x0201);
    }

    #[test]
    fn truncated_blob_rewinds() {
        let mut reader = Reader::new(&[5, 1, 2]);
        assert!(reader.bytes(Width::U8).is_err());
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut reader = Reader::new(&[2, 0xff, 0xfe]);
        assert_eq!(reader.string(Width::U8).unwrap_err(), CodecError::InvalidUtf8);
    }

    #[test]
    fn collections_roundtrip() {
        let mut writer = Writer::new();
        writer.put_collection(Width::U64, &[3u16, 2u16]).unwrap();
        writer
            .put_strings(Width::U8, Width::U16, &["a", "bc"])
            .unwrap();

        let bytes = writer.into_bytes();
        let mut reader = Reader::new(&bytes);
        assert_eq!(reader.collection::<u16>(Width::U64).unwrap(), vec![3, 2]);
        assert_eq!(
            reader.strings(Width::U8, Width::U16).unwrap(),
            vec!["a".to_string(), "bc".to_string()]
        );
    }

    #[test]
    fn hostile_count_fails_without_allocating() {
        let mut bytes = u64::MAX.to_le_bytes().to_vec();
        bytes.push(0);
        let mut reader = Reader::new(&bytes);
        assert!(reader.collection::<u32>(Width::U64).is_err());
    }

    #[test]
    fn rest_consumes_everything() {
        let mut reader = Reader::new(&[1, 2, 3]);
        reader.u8().unwrap();
        assert_eq!(reader.rest(), &[2, 3]);
        assert!(reader.is_empty());
        assert_eq!(reader.rest(), &[] as &[u8]);
    }
}

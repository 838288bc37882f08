//! Envelope framing.
//!
//! An envelope is the storage unit shared by the local cache and the remote
//! record:
//!
//! ```text
//! compressed:  zlib( [version u8][timestamp u32 LE][len u32 LE][payload] )
//! framed:      [MAGIC 8][firmware u8][version u8][timestamp u32 LE][len u32 LE][payload]
//! ```
//!
//! The framed layout is never compressed. Decoding checks for the magic
//! prefix first and falls back to decompression otherwise.

use crate::compress::{compress, decompress};
use crate::error::{CodecError, CodecResult};
use crate::reader::Reader;
use crate::writer::{Width, Writer};

/// Magic prefix of the uncompressed framed layout.
pub const MAGIC: [u8; 8] = *b"KEEPSAKE";

/// Firmware tag written by this implementation.
pub const FIRMWARE: u8 = 0;

/// Size of the fixed part of a frame (version, timestamp, payload length).
pub const HEADER_LEN: usize = 1 + 4 + 4;

/// How an envelope was (or should be) laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Whole frame compressed with zlib.
    Compressed,
    /// Magic-prefixed frame stored as is.
    Framed {
        /// Firmware tag following the magic.
        firmware: u8,
    },
}

/// An envelope whose payload has not been interpreted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEnvelope {
    /// Schema version the payload was written with.
    pub version: u8,
    /// Logical timestamp in seconds.
    pub timestamp: u32,
    /// Payload bytes in the layout of `version`.
    pub payload: Vec<u8>,
}

impl RawEnvelope {
    /// Creates a new raw envelope.
    pub fn new(version: u8, timestamp: u32, payload: Vec<u8>) -> Self {
        Self {
            version,
            timestamp,
            payload,
        }
    }

    /// Encodes to the compressed layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload exceeds `u32::MAX` bytes or
    /// compression fails.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        self.encode_as(Format::Compressed)
    }

    /// Encodes to the uncompressed magic-prefixed layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload exceeds `u32::MAX` bytes.
    pub fn encode_framed(&self, firmware: u8) -> CodecResult<Vec<u8>> {
        self.encode_as(Format::Framed { firmware })
    }

    /// Encodes using the given layout.
    ///
    /// # Errors
    ///
    /// See [`encode`](Self::encode).
    pub fn encode_as(&self, format: Format) -> CodecResult<Vec<u8>> {
        match format {
            Format::Compressed => {
                let mut writer = Writer::with_capacity(HEADER_LEN + self.payload.len());
                self.write_frame(&mut writer)?;
                compress(writer.as_bytes())
            }
            Format::Framed { firmware } => {
                let mut writer =
                    Writer::with_capacity(MAGIC.len() + 1 + HEADER_LEN + self.payload.len());
                writer.put_raw(&MAGIC).put_u8(firmware);
                self.write_frame(&mut writer)?;
                Ok(writer.into_bytes())
            }
        }
    }

    /// Decodes either layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be decompressed or the frame is
    /// shorter than its header or declared payload length.
    pub fn decode(bytes: &[u8]) -> CodecResult<Self> {
        Self::decode_with_format(bytes).map(|(envelope, _)| envelope)
    }

    /// Decodes either layout and reports which one was found.
    ///
    /// # Errors
    ///
    /// See [`decode`](Self::decode).
    pub fn decode_with_format(bytes: &[u8]) -> CodecResult<(Self, Format)> {
        if is_framed(bytes) {
            let firmware = bytes[MAGIC.len()];
            let envelope = Self::read_frame(&bytes[MAGIC.len() + 1..])?;
            return Ok((envelope, Format::Framed { firmware }));
        }

        let body = decompress(bytes)?;
        Ok((Self::read_frame(&body)?, Format::Compressed))
    }

    fn write_frame(&self, writer: &mut Writer) -> CodecResult<()> {
        writer.put_u8(self.version).put_timestamp(self.timestamp);
        writer.put_bytes(Width::U32, &self.payload)?;
        Ok(())
    }

    fn read_frame(body: &[u8]) -> CodecResult<Self> {
        if body.len() < HEADER_LEN {
            return Err(CodecError::UnexpectedEof {
                needed: HEADER_LEN,
                remaining: body.len(),
            });
        }
        let mut reader = Reader::new(body);
        let version = reader.u8()?;
        let timestamp = reader.timestamp()?;
        let payload = reader.bytes(Width::U32)?.to_vec();
        Ok(Self {
            version,
            timestamp,
            payload,
        })
    }
}

/// Returns true if `bytes` start with the framed-layout magic.
pub fn is_framed(bytes: &[u8]) -> bool {
    bytes.len() > MAGIC.len() && bytes[..MAGIC.len()] == MAGIC
}

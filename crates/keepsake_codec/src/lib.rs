//! # Keepsake Codec
//!
//! Versioned, timestamped envelopes for Keepsake documents.
//!
//! This crate provides:
//! - Little-endian byte primitives ([`Writer`], [`Reader`]) with
//!   caller-chosen length prefix widths
//! - zlib compression of framed buffers
//! - Raw envelope framing ([`RawEnvelope`]) in the compressed layout and the
//!   uncompressed magic-prefixed layout
//! - Typed envelopes ([`Envelope`]) for [`Archive`] documents, with a
//!   version-indexed [`MigrationTable`] for older layouts
//!
//! ## Usage
//!
//! ```
//! use keepsake_codec::{Archive, CodecResult, Envelope, Reader, Width, Writer};
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Greeting {
//!     text: String,
//!     timestamp: u32,
//! }
//!
//! impl Archive for Greeting {
//!     const VERSION: u8 = 1;
//!
//!     fn timestamp(&self) -> u32 {
//!         self.timestamp
//!     }
//!
//!     fn set_timestamp(&mut self, timestamp: u32) {
//!         self.timestamp = timestamp;
//!     }
//!
//!     fn write_payload(&self, writer: &mut Writer) -> CodecResult<()> {
//!         writer.put_str(Width::U16, &self.text)?;
//!         Ok(())
//!     }
//!
//!     fn read_payload(reader: &mut Reader<'_>) -> CodecResult<Self> {
//!         Ok(Self {
//!             text: reader.string(Width::U16)?,
//!             timestamp: 0,
//!         })
//!     }
//! }
//!
//! let greeting = Greeting { text: "hello".into(), timestamp: 42 };
//! let bytes = Envelope::new(greeting.clone()).encode().unwrap();
//!
//! let decoded = Envelope::<Greeting>::decode(&bytes);
//! assert_eq!(decoded.timestamp, 42);
//! assert_eq!(decoded.payload, greeting);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod archive;
mod clock;
mod compress;
mod envelope;
mod error;
mod reader;
mod writer;

pub use archive::{Archive, Envelope, Migration, MigrationTable};
pub use clock::unix_now;
pub use compress::{compress, decompress, decompress_limited, MAX_DECOMPRESSED};
pub use envelope::{is_framed, Format, RawEnvelope, FIRMWARE, HEADER_LEN, MAGIC};
pub use error::{CodecError, CodecResult};
pub use reader::{Decode, Reader};
pub use writer::{Encode, Width, Writer};

//! Compression of framed buffers.
//!
//! The codec treats compression as an opaque byte transform. zlib is used
//! because its header and trailing checksum make foreign or damaged input
//! fail loudly instead of inflating into garbage.

use crate::error::{CodecError, CodecResult};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Compress a buffer.
///
/// # Errors
///
/// Returns [`CodecError::Compression`] if the encoder fails.
pub fn compress(bytes: &[u8]) -> CodecResult<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(bytes.len() / 2 + 16),
        Compression::default(),
    );
    encoder
        .write_all(bytes)
        .map_err(|e| CodecError::compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| CodecError::compression(e.to_string()))
}

/// Largest decompressed size accepted by [`decompress`].
pub const MAX_DECOMPRESSED: u64 = 64 * 1024 * 1024;

/// Decompress a buffer produced by [`compress`], up to [`MAX_DECOMPRESSED`] bytes.
///
/// # Errors
///
/// Returns [`CodecError::Decompression`] for empty, truncated, foreign or
/// oversized input.
pub fn decompress(bytes: &[u8]) -> CodecResult<Vec<u8>> {
    decompress_limited(bytes, MAX_DECOMPRESSED)
}

/// Decompress a buffer, failing once the output would exceed `limit` bytes.
///
/// # Errors
///
/// See [`decompress`].
pub fn decompress_limited(bytes: &[u8], limit: u64) -> CodecResult<Vec<u8>> {
    if bytes.is_empty() {
        return Err(CodecError::decompression("empty input"));
    }
    let mut decoder = ZlibDecoder::new(bytes).take(limit.saturating_add(1));
    let mut out = Vec::with_capacity(bytes.len().saturating_mul(2));
    decoder
        .read_to_end(&mut out)
        .map_err(|e| CodecError::decompression(e.to_string()))?;
    if out.len() as u64 > limit {
        return Err(CodecError::decompression(format!(
            "output exceeds {limit} bytes"
        )));
    }
    Ok(out)
}

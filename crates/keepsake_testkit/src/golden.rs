//! Golden byte vectors for the primitive encodings.
//!
//! Each vector pairs the bytes a [`Writer`] produces today with the bytes
//! the wire format requires. A mismatch means the format changed.

use keepsake_codec::{CodecResult, RawEnvelope, Width, Writer, FIRMWARE, MAGIC};
use std::fmt::Write as _;
use uuid::Uuid;

/// One encoding checked against its expected bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldenVector {
    /// What was encoded.
    pub name: &'static str,
    /// Bytes required by the format.
    pub expected: Vec<u8>,
    /// Bytes produced by the current writer.
    pub actual: Vec<u8>,
}

impl GoldenVector {
    /// Returns true if the writer output matches.
    pub fn matches(&self) -> bool {
        self.expected == self.actual
    }
}

fn vector(
    name: &'static str,
    expected: Vec<u8>,
    write: impl FnOnce(&mut Writer) -> CodecResult<()>,
) -> CodecResult<GoldenVector> {
    let mut writer = Writer::new();
    write(&mut writer)?;
    Ok(GoldenVector {
        name,
        expected,
        actual: writer.into_bytes(),
    })
}

/// Vectors for every primitive the writer supports.
///
/// # Errors
///
/// Returns an error only if the writer rejects one of the fixed inputs.
pub fn primitive_vectors() -> CodecResult<Vec<GoldenVector>> {
    let uuid = Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
    let mut uuid_bytes = vec![36];
    uuid_bytes.extend_from_slice(b"01234567-89AB-CDEF-0123-456789ABCDEF");

    Ok(vec![
        vector("u8", vec![0xab], |w| {
            w.put_u8(0xab);
            Ok(())
        })?,
        vector("u16", vec![0x34, 0x12], |w| {
            w.put_u16(0x1234);
            Ok(())
        })?,
        vector("u32", vec![0xef, 0xbe, 0xad, 0xde], |w| {
            w.put_u32(0xdead_beef);
            Ok(())
        })?,
        vector("u64", vec![1, 0, 0, 0, 0, 0, 0, 0x80], |w| {
            w.put_u64(0x8000_0000_0000_0001);
            Ok(())
        })?,
        vector("bool", vec![1, 0], |w| {
            w.put_bool(true).put_bool(false);
            Ok(())
        })?,
        vector("timestamp", vec![0x00, 0xf1, 0x53, 0x65], |w| {
            w.put_timestamp(1_700_000_000);
            Ok(())
        })?,
        vector("str_u8", vec![2, b'h', b'i'], |w| {
            w.put_str(Width::U8, "hi")?;
            Ok(())
        })?,
        vector("str_u16", vec![2, 0, b'h', b'i'], |w| {
            w.put_str(Width::U16, "hi")?;
            Ok(())
        })?,
        vector("bytes_u32", vec![1, 0, 0, 0, 9], |w| {
            w.put_bytes(Width::U32, &[9])?;
            Ok(())
        })?,
        vector("bytes_u64_empty", vec![0; 8], |w| {
            w.put_bytes(Width::U64, &[])?;
            Ok(())
        })?,
        vector("uuid", uuid_bytes, |w| {
            w.put_uuid(&uuid);
            Ok(())
        })?,
        vector("strings", vec![2, 1, b'a', 2, b'b', b'c'], |w| {
            w.put_strings(Width::U8, Width::U8, &["a", "bc"])?;
            Ok(())
        })?,
        vector("collection_u16", vec![2, 0, 5, 0, 6, 0], |w| {
            w.put_collection(Width::U16, &[5u16, 6u16])?;
            Ok(())
        })?,
    ])
}

/// The uncompressed framed layout of a small envelope.
///
/// # Errors
///
/// Returns an error only if framing fails.
pub fn framed_envelope_vector() -> CodecResult<GoldenVector> {
    let mut expected = MAGIC.to_vec();
    expected.extend_from_slice(&[FIRMWARE, 3, 0x04, 0x03, 0x02, 0x01, 1, 0, 0, 0, 0xaa]);
    Ok(GoldenVector {
        name: "framed_envelope",
        expected,
        actual: RawEnvelope::new(3, 0x0102_0304, vec![0xaa]).encode_framed(FIRMWARE)?,
    })
}

/// Panics with a hex dump of every vector that does not match.
pub fn assert_golden(vectors: &[GoldenVector]) {
    let failures: Vec<String> = vectors
        .iter()
        .filter(|v| !v.matches())
        .map(|v| {
            format!(
                "{}: expected {} got {}",
                v.name,
                hex_encode(&v.expected),
                hex_encode(&v.actual)
            )
        })
        .collect();
    assert!(failures.is_empty(), "golden mismatch:\n{}", failures.join("\n"));
}

/// Encodes bytes as lowercase hex.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

/// Decodes lowercase or uppercase hex. Returns `None` on odd length or a
/// non-hex digit.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| hex.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect()
}

//! Property-based test generators using proptest.

use crate::fixtures::{Counter, Note};
use keepsake_codec::{Format, RawEnvelope, Width, MAGIC};
use proptest::prelude::*;
use uuid::Uuid;

/// Strategy for logical timestamps, biased towards the edges.
pub fn timestamp_strategy() -> impl Strategy<Value = u32> {
    prop_oneof![
        Just(0u32),
        Just(u32::MAX),
        1_600_000_000u32..1_900_000_000,
        any::<u32>(),
    ]
}

/// Strategy for length prefix widths.
pub fn width_strategy() -> impl Strategy<Value = Width> {
    prop_oneof![
        Just(Width::U8),
        Just(Width::U16),
        Just(Width::U32),
        Just(Width::U64),
    ]
}

/// Strategy for envelope layouts.
pub fn format_strategy() -> impl Strategy<Value = Format> {
    prop_oneof![
        Just(Format::Compressed),
        any::<u8>().prop_map(|firmware| Format::Framed { firmware }),
    ]
}

/// Strategy for raw envelopes with arbitrary payload bytes.
pub fn raw_envelope_strategy() -> impl Strategy<Value = RawEnvelope> {
    (
        any::<u8>(),
        timestamp_strategy(),
        prop::collection::vec(any::<u8>(), 0..512),
    )
        .prop_map(|(version, timestamp, payload)| RawEnvelope::new(version, timestamp, payload))
}

/// Strategy for [`Counter`] documents.
pub fn counter_strategy() -> impl Strategy<Value = Counter> {
    (
        any::<u64>(),
        ".{0,32}",
        prop::collection::vec("[a-z]{1,8}", 0..6),
        timestamp_strategy(),
    )
        .prop_map(|(count, label, tags, timestamp)| {
            Counter::new(count, timestamp)
                .with_label(label)
                .with_tags(tags)
        })
}

/// Strategy for [`Note`] documents.
pub fn note_strategy() -> impl Strategy<Value = Note> {
    (
        any::<u128>(),
        ".{0,64}",
        ".{0,256}",
        any::<bool>(),
        timestamp_strategy(),
    )
        .prop_map(|(id, title, body, pinned, timestamp)| Note {
            id: Uuid::from_u128(id),
            title,
            body,
            pinned,
            timestamp,
        })
}

/// Strategy for bytes that are neither zlib streams nor framed envelopes.
pub fn garbage_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256).prop_filter(
        "must not look like an envelope",
        |bytes| {
            // a zlib header names deflate in the low nibble
            bytes.first().map_or(true, |b| b & 0x0f != 0x08) && !bytes.starts_with(&MAGIC)
        },
    )
}

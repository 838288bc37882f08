//! Wall-clock helper for logical timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch, saturating into `u32`.
///
/// A clock set before the epoch reads as 0.
pub fn unix_now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u32::try_from(d.as_secs()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

//! # Keepsake Testkit
//!
//! Test utilities for Keepsake.
//!
//! This crate provides:
//! - Archive fixtures with a migration history ([`Counter`]) and a plain
//!   document ([`Note`])
//! - Legacy encoders that forge envelopes written by older schema versions
//! - Property-based test generators using proptest
//! - Golden byte vectors for the primitive encodings
//! - Temporary cache directories and a tracing initializer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use keepsake_testkit::prelude::*;
//!
//! #[test]
//! fn migrates_v1() {
//!     let bytes = legacy::counter_v1(7, 1_000).unwrap();
//!     let envelope = Envelope::<Counter>::try_decode(&bytes).unwrap();
//!     assert_eq!(envelope.payload.count, 7);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod golden;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::golden::*;
    pub use keepsake_codec::{Archive, Envelope, RawEnvelope};
}

pub use fixtures::*;
pub use generators::*;
pub use golden::*;

use std::sync::Once;

static TRACING: Once = Once::new();

/// Installs a `tracing` subscriber for tests, once per process.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Output goes
/// through the test writer so it is captured per test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

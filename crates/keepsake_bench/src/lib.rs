//! Shared inputs for the Keepsake benchmarks.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;

//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Compressing the framed buffer failed.
    #[error("compression failed: {message}")]
    Compression {
        /// Description of the compression error.
        message: String,
    },

    /// The input is not a valid compressed stream.
    #[error("decompression failed: {message}")]
    Decompression {
        /// Description of the decompression error.
        message: String,
    },

    /// Unexpected end of input.
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes the read required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// Invalid UTF-8 string.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// Invalid UUID text.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// A length does not fit in the chosen width tag.
    #[error("length {len} does not fit in a {width}-byte length prefix")]
    LengthOverflow {
        /// The length that was written.
        len: usize,
        /// Width of the prefix in bytes.
        width: usize,
    },

    /// The envelope was written by a schema version with no migration.
    #[error("unsupported schema version {found} (current {current})")]
    UnsupportedVersion {
        /// Version byte found in the envelope.
        found: u8,
        /// Version the decoder expects.
        current: u8,
    },

    /// Invalid payload structure.
    #[error("invalid payload: {message}")]
    InvalidPayload {
        /// Description of the structural error.
        message: String,
    },
}

impl CodecError {
    /// Create a compression error.
    pub fn compression(message: impl Into<String>) -> Self {
        Self::Compression {
            message: message.into(),
        }
    }

    /// Create a decompression error.
    pub fn decompression(message: impl Into<String>) -> Self {
        Self::Decompression {
            message: message.into(),
        }
    }

    /// Create an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Returns true if the error means the bytes are not ours at all
    /// (foreign, truncated or corrupt) rather than a schema mismatch.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            CodecError::Decompression { .. }
                | CodecError::UnexpectedEof { .. }
                | CodecError::InvalidUtf8
                | CodecError::InvalidPayload { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CodecError::UnsupportedVersion {
            found: 1,
            current: 3,
        };
        assert_eq!(err.to_string(), "unsupported schema version 1 (current 3)");

        let err = CodecError::LengthOverflow { len: 300, width: 1 };
        assert!(err.to_string().contains("300"));
    }

    #[test]
    fn corrupt_classification() {
        assert!(CodecError::decompression("bad header").is_corrupt());
        assert!(CodecError::UnexpectedEof {
            needed: 4,
            remaining: 1
        }
        .is_corrupt());
        assert!(!CodecError::UnsupportedVersion {
            found: 9,
            current: 3
        }
        .is_corrupt());
        assert!(!CodecError::compression("oom").is_corrupt());
    }
}

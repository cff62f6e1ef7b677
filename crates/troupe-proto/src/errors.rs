//! Codec error types.

use thiserror::Error;

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors produced while encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Buffer ended before the structure being decoded was complete
    #[error("truncated input: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes required
        expected: usize,
        /// Bytes available
        actual: usize,
    },

    /// Header did not start with the frame magic
    #[error("invalid magic: {found:02x?}")]
    InvalidMagic {
        /// Bytes found where the magic was expected
        found: [u8; 2],
    },

    /// Header carried a protocol version this codec does not speak
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    /// Payload length exceeds the codec limit
    #[error("payload of {size} bytes exceeds limit of {max} bytes")]
    PayloadTooLarge {
        /// Declared or actual payload size
        size: usize,
        /// Maximum accepted size
        max: usize,
    },

    /// Control payload could not be serialised or deserialised
    #[error("control payload: {0}")]
    ControlPayload(String),

    /// Control payload decoded, but the identity it carries is not usable
    #[error("invalid actor description: {0}")]
    InvalidIdentity(&'static str),
}

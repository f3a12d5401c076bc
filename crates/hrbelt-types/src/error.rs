//! Error types for data parsing in hrbelt-types.

use thiserror::Error;

/// Errors that can occur when parsing dongle payloads.
///
/// This error type is transport-agnostic and does not include
/// link-level errors (those belong in hrbelt-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A 2-byte UUID reversal was requested on input of a different length.
    ///
    /// The dongle transmits UUIDs byte-reversed relative to their canonical
    /// big-endian form, and only 16-bit UUIDs are ever reversed for
    /// comparison. Hitting this with the fixed constant UUIDs is a
    /// programming error, not a runtime condition.
    #[error("Malformed UUID: expected 2 bytes, got {actual}")]
    MalformedUuid {
        /// Length of the input that was passed in.
        actual: usize,
    },

    /// A heart-rate measurement notification was shorter than the minimum
    /// length implied by its flags byte.
    #[error("Truncated measurement: flags require {expected} bytes, got {actual}")]
    TruncatedMeasurement {
        /// Minimum payload length required by the flags byte.
        expected: usize,
        /// Actual payload length received.
        actual: usize,
    },

    /// A hardware address string could not be parsed.
    #[error("Invalid hardware address: {0}")]
    InvalidAddress(String),
}

/// Result type alias using hrbelt-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

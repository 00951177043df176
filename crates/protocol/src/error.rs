//! Decode-time error type.

use thiserror::Error;

/// Error type for encoding and decoding BSER values.
///
/// None of these are recoverable for the value being decoded: there is no
/// resynchronization, so the whole response should be dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Fewer bytes remain than the value declares.
    #[error("truncated input: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes required to finish the read.
        needed: usize,
        /// Bytes left before the end cursor.
        available: usize,
    },

    /// The byte at the cursor is not a valid marker in this position.
    #[error("unexpected marker 0x{found:02x} (expected {expected})")]
    BadMarker {
        /// What the reader was looking for.
        expected: &'static str,
        /// The marker actually present.
        found: u8,
    },

    /// An array, object or string declares a negative size.
    #[error("negative count: {0}")]
    NegativeCount(i64),

    /// Skip encountered a marker outside the known set.
    #[error("unsupported type marker 0x{0:02x}")]
    UnsupportedType(u8),

    /// Nested containers exceed the decoder's recursion limit.
    #[error("nesting deeper than {0} levels")]
    DepthExceeded(usize),

    /// Declared PDU length disagrees with the bytes present.
    #[error("payload size mismatch: declared {declared}, actual {actual}")]
    SizeMismatch {
        /// Length announced by the header.
        declared: usize,
        /// Length actually available or consumed.
        actual: usize,
    },

    /// The data is well formed but breaks an expected post-condition.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl Error {
    pub(crate) fn truncated(needed: usize, available: usize) -> Self {
        Self::Truncated { needed, available }
    }

    pub(crate) fn bad_marker(expected: &'static str, found: u8) -> Self {
        Self::BadMarker { expected, found }
    }
}

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, Error>;

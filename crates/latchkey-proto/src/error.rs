//! Protocol decoding errors.

use thiserror::Error;

/// Errors from decoding link bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtoError {
    /// Byte is not one of the fixed link codes.
    #[error("unknown link code: {0:#04x}")]
    UnknownCode(u8),

    /// Byte is not a decimal digit (0-9).
    #[error("invalid digit byte: {0:#04x}")]
    InvalidDigit(u8),

    /// A frame did not start with the `Ready` marker.
    #[error("expected ready marker, got {0:#04x}")]
    MissingReady(u8),

    /// Valid code, but not the one this step of the exchange accepts.
    #[error("unexpected link code {code:?} where {expected} was expected")]
    UnexpectedCode {
        /// The code that arrived.
        code: crate::LinkCode,
        /// What the decoder was waiting for.
        expected: &'static str,
    },
}

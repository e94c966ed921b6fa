//! Credential digits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// Number of digits in a credential or candidate.
pub const PASSCODE_LEN: usize = 5;

/// A single decimal digit (0-9).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Digit(u8);

impl Digit {
    /// Largest digit value.
    pub const MAX: u8 = 9;

    /// Build a digit, rejecting values above 9.
    pub fn new(value: u8) -> Result<Self, ProtoError> {
        if value > Self::MAX {
            return Err(ProtoError::InvalidDigit(value));
        }
        Ok(Self(value))
    }

    /// Numeric value.
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Digit {
    type Error = ProtoError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Digit> for u8 {
    fn from(digit: Digit) -> Self {
        digit.0
    }
}

/// Five ordered digits: a stored credential or a transient candidate.
///
/// # Security
///
/// - **Debug Redaction**: The `Debug` impl never prints digits, so passcodes
///   can flow through `tracing` fields without leaking.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Passcode([Digit; PASSCODE_LEN]);

impl Passcode {
    /// Build from already-validated digits.
    pub const fn new(digits: [Digit; PASSCODE_LEN]) -> Self {
        Self(digits)
    }

    /// Build from raw bytes, each of which must be 0-9.
    pub fn from_bytes(bytes: [u8; PASSCODE_LEN]) -> Result<Self, ProtoError> {
        let mut digits = [Digit(0); PASSCODE_LEN];
        for (slot, byte) in digits.iter_mut().zip(bytes) {
            *slot = Digit::new(byte)?;
        }
        Ok(Self(digits))
    }

    /// Build from a slice; the slice must hold exactly five digit bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProtoError> {
        let array: [u8; PASSCODE_LEN] = bytes
            .try_into()
            .map_err(|_| ProtoError::InvalidDigit(bytes.get(PASSCODE_LEN).copied().unwrap_or(0)))?;
        Self::from_bytes(array)
    }

    /// Digits in entry order.
    pub const fn digits(&self) -> &[Digit; PASSCODE_LEN] {
        &self.0
    }

    /// Raw digit bytes in entry order.
    pub fn to_bytes(&self) -> [u8; PASSCODE_LEN] {
        self.0.map(Digit::value)
    }

    /// Index of the first differing position, or `None` if all five match.
    ///
    /// Comparison stops at the first difference; there is no partial credit.
    pub fn first_mismatch(&self, other: &Self) -> Option<usize> {
        self.0.iter().zip(other.0.iter()).position(|(a, b)| a != b)
    }

    /// True iff every position is equal.
    pub fn matches(&self, other: &Self) -> bool {
        self.first_mismatch(other).is_none()
    }
}

impl fmt::Debug for Passcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passcode(<redacted>)")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn passcode() -> impl Strategy<Value = Passcode> {
        prop::array::uniform5(0u8..=9).prop_map(|bytes| Passcode::from_bytes(bytes).unwrap())
    }

    #[test]
    fn digit_bounds() {
        assert_eq!(Digit::new(9).unwrap().value(), 9);
        assert_eq!(Digit::new(10), Err(ProtoError::InvalidDigit(10)));
    }

    #[test]
    fn from_bytes_rejects_non_digits() {
        assert!(Passcode::from_bytes([1, 2, 3, 4, 5]).is_ok());
        assert_eq!(Passcode::from_bytes([1, 2, 0x0a, 4, 5]), Err(ProtoError::InvalidDigit(0x0a)));
    }

    #[test]
    fn from_slice_requires_exact_length() {
        assert!(Passcode::from_slice(&[1, 2, 3, 4]).is_err());
        assert!(Passcode::from_slice(&[1, 2, 3, 4, 5, 6]).is_err());
        assert_eq!(Passcode::from_slice(&[1, 2, 3, 4, 5]).unwrap().to_bytes(), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn debug_is_redacted() {
        let code = Passcode::from_bytes([1, 2, 3, 4, 5]).unwrap();
        let rendered = format!("{code:?}");
        assert!(!rendered.contains('1'));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn mismatch_reports_first_position() {
        let stored = Passcode::from_bytes([1, 2, 3, 4, 5]).unwrap();
        let candidate = Passcode::from_bytes([1, 2, 9, 4, 0]).unwrap();
        assert_eq!(stored.first_mismatch(&candidate), Some(2));
        assert!(!stored.matches(&candidate));
        assert!(stored.matches(&stored));
    }

    proptest! {
        #[test]
        fn prop_match_iff_all_positions_equal(a in passcode(), b in passcode()) {
            let all_equal = a.to_bytes().iter().zip(b.to_bytes().iter()).all(|(x, y)| x == y);
            prop_assert_eq!(a.matches(&b), all_equal);
        }

        #[test]
        fn prop_single_differing_position_fails(
            base in passcode(),
            position in 0..PASSCODE_LEN,
            bump in 1u8..=9,
        ) {
            let mut bytes = base.to_bytes();
            bytes[position] = (bytes[position] + bump) % 10;
            let changed = Passcode::from_bytes(bytes).unwrap();

            prop_assert!(!base.matches(&changed));
            prop_assert_eq!(base.first_mismatch(&changed), Some(position));
        }
    }
}

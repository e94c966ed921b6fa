//! Single-byte link codes.

use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::error::ProtoError;

/// Every byte value with a fixed meaning on the link.
///
/// Digit bytes of a candidate (0-9) overlap with these values; whether a byte
/// is a code or a digit depends only on the step of the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum LinkCode {
    /// Outcome: match, proceed.
    NoRepeat = 0x00,
    /// Marker: a payload (candidate or outcome) follows.
    Ready = 0x01,
    /// Outcome: mismatch, retry required.
    Repeat = 0x02,
    /// HMI -> Control: user selected door open.
    OpenDoor = 0x03,
    /// HMI -> Control: user selected credential change.
    ChangePassword = 0x04,
    /// Reserved for lockout signaling. Never sent by either node.
    LockSystem = 0x05,
    /// Control -> HMI: presence sensor cleared, safe to close.
    NoPeople = 0x06,
}

impl LinkCode {
    /// Wire value.
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Decode a wire value.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::NoRepeat),
            0x01 => Some(Self::Ready),
            0x02 => Some(Self::Repeat),
            0x03 => Some(Self::OpenDoor),
            0x04 => Some(Self::ChangePassword),
            0x05 => Some(Self::LockSystem),
            0x06 => Some(Self::NoPeople),
            _ => None,
        }
    }
}

impl TryFrom<u8> for LinkCode {
    type Error = ProtoError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_u8(byte).ok_or(ProtoError::UnknownCode(byte))
    }
}

impl From<LinkCode> for u8 {
    fn from(code: LinkCode) -> Self {
        code.to_u8()
    }
}

/// Command selected by the user in the Idle menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Verify, then run one door cycle.
    OpenDoor,
    /// Verify, then enroll a replacement credential.
    ChangePassword,
}

impl Command {
    /// Link code carrying this command.
    pub const fn code(self) -> LinkCode {
        match self {
            Self::OpenDoor => LinkCode::OpenDoor,
            Self::ChangePassword => LinkCode::ChangePassword,
        }
    }

    /// Decode a command byte received while Idle.
    pub fn from_byte(byte: u8) -> Result<Self, ProtoError> {
        match LinkCode::try_from(byte)? {
            LinkCode::OpenDoor => Ok(Self::OpenDoor),
            LinkCode::ChangePassword => Ok(Self::ChangePassword),
            code => Err(ProtoError::UnexpectedCode { code, expected: "a command" }),
        }
    }
}

/// Result of an enrollment or verification round, as reported by Control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Candidates matched.
    Proceed,
    /// Candidates differed; the round must be repeated.
    Retry,
}

impl Outcome {
    /// Link code carrying this outcome.
    pub const fn code(self) -> LinkCode {
        match self {
            Self::Proceed => LinkCode::NoRepeat,
            Self::Retry => LinkCode::Repeat,
        }
    }

    /// Outcome for a comparison result.
    pub const fn from_match(matched: bool) -> Self {
        if matched { Self::Proceed } else { Self::Retry }
    }

    /// Decode the byte following `Ready` in an outcome frame.
    pub fn from_byte(byte: u8) -> Result<Self, ProtoError> {
        match LinkCode::try_from(byte)? {
            LinkCode::NoRepeat => Ok(Self::Proceed),
            LinkCode::Repeat => Ok(Self::Retry),
            code => Err(ProtoError::UnexpectedCode { code, expected: "an outcome" }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn code_values_are_fixed() {
        assert_eq!(LinkCode::Ready.to_u8(), 0x01);
        assert_eq!(LinkCode::Repeat.to_u8(), 0x02);
        assert_eq!(LinkCode::NoRepeat.to_u8(), 0x00);
        assert_eq!(LinkCode::OpenDoor.to_u8(), 0x03);
        assert_eq!(LinkCode::ChangePassword.to_u8(), 0x04);
        assert_eq!(LinkCode::LockSystem.to_u8(), 0x05);
        assert_eq!(LinkCode::NoPeople.to_u8(), 0x06);
    }

    #[test]
    fn every_code_decodes_to_itself() {
        for byte in 0x00..=0x06u8 {
            assert_eq!(LinkCode::from_u8(byte).unwrap().to_u8(), byte);
        }
        assert_eq!(LinkCode::try_from(0x07), Err(ProtoError::UnknownCode(0x07)));
    }

    #[test]
    fn command_rejects_non_command_codes() {
        assert_eq!(Command::from_byte(0x03), Ok(Command::OpenDoor));
        assert_eq!(Command::from_byte(0x04), Ok(Command::ChangePassword));
        assert!(matches!(
            Command::from_byte(LinkCode::Ready.to_u8()),
            Err(ProtoError::UnexpectedCode { code: LinkCode::Ready, .. })
        ));
        assert_eq!(Command::from_byte(0xff), Err(ProtoError::UnknownCode(0xff)));
    }

    #[test]
    fn outcome_codes() {
        assert_eq!(Outcome::from_match(true).code(), LinkCode::NoRepeat);
        assert_eq!(Outcome::from_match(false).code(), LinkCode::Repeat);
        assert_eq!(Outcome::from_byte(0x00), Ok(Outcome::Proceed));
        assert_eq!(Outcome::from_byte(0x02), Ok(Outcome::Retry));
        assert!(Outcome::from_byte(LinkCode::NoPeople.to_u8()).is_err());
    }

    #[test]
    fn serde_encodes_codes_as_integers() {
        let mut buf = Vec::new();
        ciborium::into_writer(&LinkCode::NoPeople, &mut buf).unwrap();
        // CBOR small unsigned integer 6
        assert_eq!(buf, vec![0x06]);

        let decoded: LinkCode = ciborium::from_reader(buf.as_slice()).unwrap();
        assert_eq!(decoded, LinkCode::NoPeople);
    }
}

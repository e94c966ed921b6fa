//! Ready-prefixed frames.
//!
//! Any multi-byte exchange on the link starts with [`LinkCode::Ready`] and is
//! followed by a fixed number of payload bytes. Frame length is implied by
//! the protocol step, never carried on the wire.

use bytes::{BufMut, Bytes, BytesMut};

use crate::{LinkCode, Outcome, PASSCODE_LEN, Passcode, error::ProtoError};

/// Payload length of a candidate frame.
pub const CANDIDATE_PAYLOAD_LEN: usize = PASSCODE_LEN;

/// Payload length of an outcome or clear frame.
pub const SIGNAL_PAYLOAD_LEN: usize = 1;

/// `Ready` followed by the five candidate digits.
pub fn encode_candidate(passcode: &Passcode) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + CANDIDATE_PAYLOAD_LEN);
    buf.put_u8(LinkCode::Ready.to_u8());
    buf.put_slice(&passcode.to_bytes());
    buf.freeze()
}

/// `Ready` followed by the outcome code.
pub fn encode_outcome(outcome: Outcome) -> Bytes {
    signal(outcome.code())
}

/// `Ready` followed by `NoPeople`.
pub fn encode_people_clear() -> Bytes {
    signal(LinkCode::NoPeople)
}

fn signal(code: LinkCode) -> Bytes {
    Bytes::copy_from_slice(&[LinkCode::Ready.to_u8(), code.to_u8()])
}

/// Incremental decoder for one Ready-prefixed frame at a time.
///
/// Bytes are pushed as they arrive from the link. The first byte must be
/// `Ready`; anything else is reported as [`ProtoError::MissingReady`] and the
/// assembler stays empty. After `payload_len` further bytes the payload is
/// returned and the assembler is ready for the next frame.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    payload_len: usize,
    started: bool,
    buf: BytesMut,
}

impl FrameAssembler {
    /// Assembler for frames with the given payload length.
    pub fn new(payload_len: usize) -> Self {
        Self { payload_len, started: false, buf: BytesMut::with_capacity(payload_len) }
    }

    /// Assembler for candidate frames.
    pub fn candidate() -> Self {
        Self::new(CANDIDATE_PAYLOAD_LEN)
    }

    /// Assembler for outcome and clear frames.
    pub fn signal() -> Self {
        Self::new(SIGNAL_PAYLOAD_LEN)
    }

    /// True when no byte of the current frame has been consumed.
    pub fn is_empty(&self) -> bool {
        !self.started
    }

    /// Drop any partially assembled frame.
    pub fn reset(&mut self) {
        self.started = false;
        self.buf.clear();
    }

    /// Feed one byte. Returns the payload once the frame is complete.
    pub fn push(&mut self, byte: u8) -> Result<Option<Bytes>, ProtoError> {
        if !self.started {
            if byte != LinkCode::Ready.to_u8() {
                return Err(ProtoError::MissingReady(byte));
            }
            self.started = true;
            return Ok(self.take_if_complete());
        }

        self.buf.put_u8(byte);
        Ok(self.take_if_complete())
    }

    fn take_if_complete(&mut self) -> Option<Bytes> {
        if self.buf.len() < self.payload_len {
            return None;
        }
        self.started = false;
        Some(self.buf.split().freeze())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hex_literal::hex;

    use super::*;

    fn code() -> Passcode {
        Passcode::from_bytes([1, 2, 3, 4, 5]).unwrap()
    }

    #[test]
    fn candidate_wire_format() {
        insta::assert_snapshot!(hex::encode(encode_candidate(&code())), @"010102030405");
    }

    #[test]
    fn signal_wire_formats() {
        assert_eq!(encode_outcome(Outcome::Proceed).as_ref(), hex!("0100"));
        assert_eq!(encode_outcome(Outcome::Retry).as_ref(), hex!("0102"));
        assert_eq!(encode_people_clear().as_ref(), hex!("0106"));
    }

    #[test]
    fn assembler_collects_candidate() {
        let mut assembler = FrameAssembler::candidate();
        let bytes = encode_candidate(&code());

        let (last, head) = bytes.split_last().unwrap();
        for byte in head {
            assert_eq!(assembler.push(*byte).unwrap(), None);
            assert!(!assembler.is_empty());
        }
        let payload = assembler.push(*last).unwrap().unwrap();

        assert_eq!(Passcode::from_slice(&payload).unwrap(), code());
        assert!(assembler.is_empty());
    }

    #[test]
    fn assembler_rejects_missing_ready() {
        let mut assembler = FrameAssembler::signal();
        assert_eq!(assembler.push(0x03), Err(ProtoError::MissingReady(0x03)));
        assert!(assembler.is_empty());
    }

    #[test]
    fn digit_bytes_equal_to_ready_are_payload() {
        // Digit 1 has the same value as Ready; position decides its meaning.
        let mut assembler = FrameAssembler::candidate();
        let mut payload = None;
        for byte in [0x01, 0x01, 0x01, 0x01, 0x01, 0x01] {
            payload = assembler.push(byte).unwrap();
        }
        assert_eq!(payload.unwrap().as_ref(), &[1, 1, 1, 1, 1]);
    }

    #[test]
    fn assembler_handles_back_to_back_frames() {
        let mut assembler = FrameAssembler::signal();
        assert_eq!(assembler.push(0x01).unwrap(), None);
        assert_eq!(assembler.push(0x02).unwrap().unwrap().as_ref(), &[0x02]);
        assert_eq!(assembler.push(0x01).unwrap(), None);
        assert_eq!(assembler.push(0x00).unwrap().unwrap().as_ref(), &[0x00]);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut assembler = FrameAssembler::candidate();
        assembler.push(0x01).unwrap();
        assembler.push(0x07).unwrap();
        assembler.reset();
        assert!(assembler.is_empty());
        assert_eq!(assembler.push(0x07), Err(ProtoError::MissingReady(0x07)));
    }
}

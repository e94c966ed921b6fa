//! Latchkey link protocol
//!
//! Wire-level vocabulary shared by the Control and HMI nodes. The link is a
//! point-to-point byte channel with no framing of its own, so every exchange
//! is built from single-byte codes:
//!
//! ```text
//! command    HMI -> Control   [OpenDoor | ChangePassword]
//! candidate  HMI -> Control   [Ready, d0, d1, d2, d3, d4]
//! outcome    Control -> HMI   [Ready, NoRepeat | Repeat]
//! clear      Control -> HMI   [Ready, NoPeople]
//! ```
//!
//! Values are fixed so both nodes agree without negotiation. Nothing here
//! performs I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod codes;
mod error;
pub mod frame;
mod passcode;

pub use codes::{Command, LinkCode, Outcome};
pub use error::ProtoError;
pub use frame::{FrameAssembler, encode_candidate, encode_outcome, encode_people_clear};
pub use passcode::{Digit, PASSCODE_LEN, Passcode};

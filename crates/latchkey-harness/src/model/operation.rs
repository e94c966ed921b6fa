//! Operations for model-based testing.
//!
//! Operations are what a user can do at the keypad. They are generated
//! randomly by proptest and applied to both the model and the real pair.

use arbitrary::Arbitrary;
use latchkey_proto::{Command, PASSCODE_LEN, Passcode};

/// Passcodes the generator draws from.
///
/// A small pool makes matches and near misses common; the last two differ from
/// the first only in the final or the first position.
pub const PASSCODE_POOL: [[u8; PASSCODE_LEN]; 4] =
    [[1, 2, 3, 4, 5], [1, 2, 3, 4, 6], [0, 2, 3, 4, 5], [9, 9, 9, 9, 9]];

/// Index into [`PASSCODE_POOL`], taken modulo its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub struct ModelPasscode(pub u8);

impl ModelPasscode {
    /// Digits of this passcode.
    pub fn digits(self) -> [u8; PASSCODE_LEN] {
        PASSCODE_POOL[usize::from(self.0) % PASSCODE_POOL.len()]
    }

    /// As a protocol passcode.
    pub fn to_passcode(self) -> Passcode {
        let digits = self.digits().map(|value| {
            latchkey_proto::Digit::new(value).unwrap_or_default()
        });
        Passcode::new(digits)
    }
}

/// Menu choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum ModelCommand {
    /// `+`
    OpenDoor,
    /// `-`
    ChangePassword,
}

impl From<ModelCommand> for Command {
    fn from(command: ModelCommand) -> Self {
        match command {
            ModelCommand::OpenDoor => Self::OpenDoor,
            ModelCommand::ChangePassword => Self::ChangePassword,
        }
    }
}

/// One user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// Type five digits and press Enter.
    Enter(ModelPasscode),
    /// Press a menu key.
    Select(ModelCommand),
}

impl Operation {
    /// Keys typed for this operation.
    pub fn keys(self) -> String {
        match self {
            Self::Enter(passcode) => {
                let mut keys: String =
                    passcode.digits().iter().map(|digit| char::from(b'0' + digit)).collect();
                keys.push('=');
                keys
            },
            Self::Select(ModelCommand::OpenDoor) => "+".to_owned(),
            Self::Select(ModelCommand::ChangePassword) => "-".to_owned(),
        }
    }
}

/// Why an operation was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    /// The keypad was waiting for a different kind of input.
    NotExpected,
}

/// Result of applying one operation.
pub type OperationResult = Result<(), OperationError>;

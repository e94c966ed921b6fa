//! Peripheral ports.
//!
//! The role engines never touch hardware. Node drivers execute engine actions
//! through these traits, and tests substitute recording or scripted versions.

use async_trait::async_trait;
use latchkey_proto::{Digit, PASSCODE_LEN, Passcode, ProtoError};
use thiserror::Error;

/// Errors from the credential store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Index outside the credential slot.
    #[error("store index {0} out of range")]
    OutOfRange(usize),

    /// Stored bytes are not a valid credential.
    #[error("stored credential is corrupt: {0}")]
    Corrupt(#[from] ProtoError),

    /// Backing medium failed.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Byte-indexed persistent slot holding the five credential digits.
///
/// Only `read` and `write` touch the medium; whole-credential access is built
/// on top of them.
pub trait CredentialStore: Send {
    /// Read the byte at `index` (0..5).
    fn read(&mut self, index: usize) -> Result<u8, StoreError>;

    /// Write the byte at `index` (0..5).
    fn write(&mut self, index: usize, value: u8) -> Result<(), StoreError>;

    /// Read all five digits.
    fn load(&mut self) -> Result<Passcode, StoreError> {
        let mut bytes = [0u8; PASSCODE_LEN];
        for (index, slot) in bytes.iter_mut().enumerate() {
            *slot = self.read(index)?;
        }
        Ok(Passcode::from_bytes(bytes)?)
    }

    /// Overwrite all five digits, or none of them.
    ///
    /// The previous contents are staged before the first write. If any write
    /// fails, the bytes already written are restored and the original error is
    /// returned. Stores whose medium can replace the slot in one step should
    /// override this.
    fn store(&mut self, passcode: &Passcode) -> Result<(), StoreError> {
        let mut previous = [0u8; PASSCODE_LEN];
        for (index, slot) in previous.iter_mut().enumerate() {
            *slot = self.read(index)?;
        }

        let next = passcode.to_bytes();
        for (index, value) in next.iter().enumerate() {
            if let Err(err) = self.write(index, *value) {
                for (restore, old) in previous.iter().enumerate().take(index) {
                    if let Err(rollback) = self.write(restore, *old) {
                        tracing::error!(index = restore, %rollback, "credential rollback failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Motor direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Drive the door open.
    Open,
    /// Drive the door closed.
    Close,
    /// Cut drive.
    Stop,
}

/// Door motor.
pub trait Actuator: Send {
    /// Drive in `direction` at `power` (0-255).
    fn drive(&mut self, direction: Direction, power: u8);
}

/// Lockout alarm.
pub trait Alarm: Send {
    /// Start sounding.
    fn on(&mut self);
    /// Stop sounding.
    fn off(&mut self);
}

/// Door-area presence sensor.
pub trait PresenceSensor: Send {
    /// True while someone is in the doorway.
    fn is_detected(&mut self) -> bool;
}

/// Two-line character display on the HMI.
pub trait Display: Send {
    /// Clear and show `text`. Lines are separated by `\n`.
    fn show(&mut self, text: &str);

    /// Append one character at the cursor.
    fn echo(&mut self, ch: char);
}

/// One keypad key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// 0-9
    Digit(Digit),
    /// `=` (entry confirm)
    Enter,
    /// `+` (open door)
    Plus,
    /// `-` (change passcode)
    Minus,
    /// Any other key.
    Other(char),
}

impl Key {
    /// Map a keypad legend to a key.
    pub fn from_char(ch: char) -> Self {
        match ch {
            '=' | '\n' | '\r' => Self::Enter,
            '+' => Self::Plus,
            '-' => Self::Minus,
            _ => ch
                .to_digit(10)
                .and_then(|value| u8::try_from(value).ok())
                .and_then(|value| Digit::new(value).ok())
                .map_or(Self::Other(ch), Self::Digit),
        }
    }
}

/// Errors from the keypad.
#[derive(Debug, Error)]
pub enum KeypadError {
    /// No more keys will ever arrive.
    #[error("keypad input closed")]
    Closed,

    /// Reading the keypad failed.
    #[error("keypad I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// HMI keypad. Blocks until a key is pressed.
#[async_trait]
pub trait Keypad: Send {
    /// Next pressed key.
    async fn read_key(&mut self) -> Result<Key, KeypadError>;
}

/// Credential store held in memory. Starts blank (not a valid credential).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCredentialStore {
    bytes: [u8; PASSCODE_LEN],
}

impl MemoryCredentialStore {
    /// Erased store, as on a fresh device.
    pub const fn blank() -> Self {
        Self { bytes: [0xff; PASSCODE_LEN] }
    }

    /// Store already holding `passcode`.
    pub fn with_passcode(passcode: &Passcode) -> Self {
        Self { bytes: passcode.to_bytes() }
    }

    /// Raw stored bytes.
    pub const fn bytes(&self) -> [u8; PASSCODE_LEN] {
        self.bytes
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::blank()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn read(&mut self, index: usize) -> Result<u8, StoreError> {
        self.bytes.get(index).copied().ok_or(StoreError::OutOfRange(index))
    }

    fn write(&mut self, index: usize, value: u8) -> Result<(), StoreError> {
        let slot = self.bytes.get_mut(index).ok_or(StoreError::OutOfRange(index))?;
        *slot = value;
        Ok(())
    }
}

//! Keypad entry routines.

use latchkey_core::hal::{Display, Key, Keypad, KeypadError};
use latchkey_proto::{Command, Digit, PASSCODE_LEN, Passcode};

/// Character echoed for each accepted digit.
pub const MASK: char = '*';

/// Collect five digits, then wait for Enter.
///
/// Each digit is echoed as [`MASK`]. Non-digit keys are ignored while
/// digits are collected, and every key other than Enter is ignored after
/// the fifth digit.
pub async fn collect_passcode<K, D>(keypad: &mut K, display: &mut D) -> Result<Passcode, KeypadError>
where
    K: Keypad + ?Sized,
    D: Display + ?Sized,
{
    let mut digits = [Digit::default(); PASSCODE_LEN];
    let mut filled = 0;

    while filled < PASSCODE_LEN {
        if let Key::Digit(digit) = keypad.read_key().await? {
            digits[filled] = digit;
            filled += 1;
            display.echo(MASK);
        }
    }

    while keypad.read_key().await? != Key::Enter {}

    Ok(Passcode::new(digits))
}

/// Wait for `+` (open door) or `-` (change passcode).
pub async fn select_command<K>(keypad: &mut K) -> Result<Command, KeypadError>
where
    K: Keypad + ?Sized,
{
    loop {
        match keypad.read_key().await? {
            Key::Plus => return Ok(Command::OpenDoor),
            Key::Minus => return Ok(Command::ChangePassword),
            _ => {},
        }
    }
}

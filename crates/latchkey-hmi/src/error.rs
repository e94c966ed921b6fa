//! HMI node error types.

use latchkey_core::{ProtocolError, hal::KeypadError, link::LinkError, timer::TimerError};
use thiserror::Error;

/// Errors from the HMI engine and node driver.
#[derive(Debug, Error)]
pub enum HmiError {
    /// Protocol violation, including link desynchronization.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Link transport failed.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Keypad failed.
    #[error("keypad error: {0}")]
    Keypad(#[from] KeypadError),

    /// Dwell timer misconfigured or unusable.
    #[error("timer error: {0}")]
    Timer(#[from] TimerError),
}

impl HmiError {
    /// Returns true if this error is fatal (unrecoverable).
    ///
    /// Control hanging up and the keypad input ending both stop the node
    /// cleanly.
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Link(err) => !err.is_closed(),
            Self::Keypad(KeypadError::Closed) => false,
            Self::Protocol(_) | Self::Keypad(_) | Self::Timer(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_shutdowns_are_not_fatal() {
        assert!(!HmiError::Link(LinkError::Closed).is_fatal());
        assert!(!HmiError::Keypad(KeypadError::Closed).is_fatal());
    }

    #[test]
    fn timer_errors_are_fatal() {
        assert!(HmiError::Timer(TimerError::ClockDisabled).is_fatal());
        assert_eq!(
            HmiError::Timer(TimerError::ClockDisabled).to_string(),
            "timer error: timer clock is disabled"
        );
    }
}

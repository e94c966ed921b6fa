//! Control node error types.

use latchkey_core::{
    ProtocolError,
    hal::StoreError,
    link::LinkError,
    timer::TimerError,
};
use thiserror::Error;

/// Errors from the Control engine and node driver.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Protocol violation, including link desynchronization.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Credential store failed.
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),

    /// Link transport failed.
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    /// Dwell timer misconfigured or unusable.
    #[error("timer error: {0}")]
    Timer(#[from] TimerError),
}

impl ControlError {
    /// Returns true if this error is fatal (unrecoverable).
    ///
    /// The only non-fatal error is the HMI hanging up, which ends the node
    /// cleanly.
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Link(err) => !err.is_closed(),
            Self::Protocol(_) | Self::Store(_) | Self::Timer(_) => true,
        }
    }
}

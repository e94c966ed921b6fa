//! Protocol error types.

use latchkey_proto::ProtoError;
use thiserror::Error;

use crate::protocol::{SessionState, Transition};

/// Errors from advancing a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The shared table has no entry for this trigger in this state.
    #[error("illegal transition {transition:?} from {from}")]
    IllegalTransition {
        /// State the session was in.
        from: SessionState,
        /// Rejected trigger.
        transition: Transition,
    },

    /// A link byte that the current step does not accept. The two nodes are
    /// out of step and there is no resynchronization.
    #[error("link desynchronized in {state}: unexpected byte {byte:#04x}")]
    UnexpectedByte {
        /// State the receiving node was in.
        state: SessionState,
        /// Offending byte.
        byte: u8,
        /// Decoding failure.
        #[source]
        source: ProtoError,
    },

    /// An input arrived that the node is not currently waiting for.
    #[error("unexpected {event} in {state}")]
    UnexpectedEvent {
        /// State the node was in.
        state: SessionState,
        /// Short description of the input.
        event: &'static str,
    },
}

impl ProtocolError {
    /// Desync helper.
    pub const fn unexpected_byte(state: SessionState, byte: u8, source: ProtoError) -> Self {
        Self::UnexpectedByte { state, byte, source }
    }

    /// True for link desynchronization.
    pub const fn is_desync(&self) -> bool {
        matches!(self, Self::UnexpectedByte { .. })
    }
}

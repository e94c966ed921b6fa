//! Latchkey protocol core
//!
//! Everything both nodes share, kept free of concrete I/O:
//!
//! - [`timer`]: interval timer abstraction (tick computation, arming, expiry)
//! - [`protocol`]: the session state table both role engines advance through
//! - [`hal`]: peripheral ports the engines' drivers call
//! - [`link`]: the byte link between the two nodes
//! - [`wait`]: the single poll-until-predicate primitive
//! - [`mod@env`]: time source abstraction
//! - [`error`]: protocol error types
//!
//! The role engines themselves live in `latchkey-control` and `latchkey-hmi`.
//! Both consume [`protocol::SessionState::next`], so the authoritative and
//! mirrored state machines cannot drift apart.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod env;
pub mod error;
pub mod hal;
pub mod link;
pub mod protocol;
pub mod system_env;
pub mod timer;
pub mod wait;

pub use env::Environment;
pub use error::ProtocolError;
pub use protocol::{AttemptCounter, MAX_ATTEMPTS, ProtocolTiming, SessionState, Transition};
pub use system_env::SystemEnv;

//! Latchkey Control node.
//!
//! The authoritative side of the pair. Owns the credential store, the door
//! motor, the lockout alarm and the presence sensor, and answers the HMI's
//! requests over the link.
//!
//! ## Architecture
//!
//! ```text
//! latchkey-control
//!   ├─ ControlEngine        (sans-IO protocol state machine)
//!   ├─ ControlNode          (driver: link, dwell timer, peripherals)
//!   ├─ FileCredentialStore  (five-byte credential file)
//!   └─ devices              (host stand-ins for motor, alarm, sensor)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod devices;
mod engine;
mod error;
mod node;
mod store;

pub use engine::{
    ControlAction, ControlAwait, ControlConfig, ControlEngine, ControlEvent, DoorPhase,
    EnrollmentScope,
};
pub use error::ControlError;
pub use node::{ControlNode, ControlPeripherals};
pub use store::FileCredentialStore;

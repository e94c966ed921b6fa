//! Latchkey HMI node.
//!
//! The user-facing side of the pair: keypad entry, display, and a mirrored
//! copy of the session state that follows Control's outcomes.
//!
//! ## Architecture
//!
//! ```text
//! latchkey-hmi
//!   ├─ HmiEngine   (sans-IO mirrored state machine)
//!   ├─ entry       (passcode and menu keypad routines)
//!   ├─ HmiNode     (driver: link, dwell timer, keypad, display)
//!   ├─ Screen      (display texts)
//!   └─ devices     (terminal keypad and display)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod devices;
mod engine;
pub mod entry;
mod error;
mod node;
mod screen;

pub use engine::{
    DoorStage, EnrollmentStep, HmiAction, HmiAwait, HmiConfig, HmiEngine, HmiEvent,
    VerificationStep,
};
pub use error::HmiError;
pub use node::{HmiNode, HmiPeripherals};
pub use screen::Screen;

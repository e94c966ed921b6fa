//! Reference model for model-based testing.
//!
//! A deliberately plain restatement of the access protocol: one credential,
//! a menu, up to three tries per command, and a lockout. Door cycles and
//! lockouts complete instantly. Operations are applied to both the model and
//! a real engine pair, and their observable states are compared.

pub mod operation;
mod world;

pub use operation::{ModelCommand, ModelPasscode, Operation, OperationError, OperationResult};
pub use world::{ModelWorld, ObservableState};

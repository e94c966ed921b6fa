//! Deterministic simulation harness for Latchkey.
//!
//! Turmoil-based environment, link and peripherals for running both nodes
//! end to end with reproducible timing, plus an in-process lockstep runner
//! for fast exploration.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and the real engines,
//! and their observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod lockstep;
pub mod model;
pub mod peripherals;
pub mod scenario;
pub mod script;
pub mod sim_env;
pub mod sim_link;

pub use lockstep::{Lockstep, LockstepError, NotAccepted};
pub use model::{
    ModelCommand, ModelPasscode, ModelWorld, ObservableState, Operation, OperationError,
    OperationResult,
};
pub use scenario::{OracleFn, RunnableScenario, Scenario, World};
pub use sim_env::SimEnv;
pub use sim_link::SimLink;

//! Scenario framework for end-to-end simulation tests.
//!
//! A scenario describes what the user types and how the doorway behaves, runs
//! both nodes as turmoil hosts, and hands the recorded [`World`] to a mandatory
//! oracle.
//!
//! ```text
//! Scenario::new("open")
//!     .keys("12345=12345=+12345=")
//!     .oracle(Box::new(|world| { ... }))
//!     .run()
//! ```

mod builder;
mod world;

pub use builder::{RunnableScenario, Scenario};
pub use world::{NodeReport, World};

/// Oracle run against the final world. Returns a description of the first
/// violated expectation.
pub type OracleFn = Box<dyn Fn(&World) -> Result<(), String>>;

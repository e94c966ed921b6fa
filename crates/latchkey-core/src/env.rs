//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples node drivers from the system clock. This
//! enables:
//!
//! - Deterministic Simulation: Turmoil provides a virtual clock, so a
//!   sixty-second lockout completes instantly and identically on every run.
//!
//! - Production Runtime: the tokio implementation uses real time without any
//!   code changes to the drivers.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Isolation: Implementations must not share global state

use std::time::{Duration, Instant};

/// Abstract environment providing time and sleeping.
///
/// Protocol engines never hold an environment; only the node drivers and the
/// [`crate::wait`] primitive do.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current time.
    ///
    /// # Invariants
    ///
    /// - Monotonicity: This method MUST return values that never decrease
    ///   within a single execution context.
    fn now(&self) -> Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code sleeps; engines are pure.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}

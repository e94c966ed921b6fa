//! Environment for turmoil hosts.

use std::time::{Duration, Instant};

use latchkey_core::Environment;

/// Simulated environment.
///
/// Every turmoil host runs on its own paused tokio clock that the simulation
/// advances tick by tick, so both `now()` and `sleep()` go through tokio time.
/// Never use `std::time::Instant::now()` inside a simulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimEnv;

impl SimEnv {
    /// Create a simulated environment for the current host.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SimEnv {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

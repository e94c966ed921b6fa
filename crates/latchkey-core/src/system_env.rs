//! Production Environment implementation using system time.

use std::time::Duration;

use crate::env::Environment;

/// Production environment backed by the tokio clock.
///
/// `now()` reads the tokio clock rather than `std::time::Instant::now()` so
/// it agrees with `sleep()` when the runtime clock is paused or simulated.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now(&self) -> std::time::Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

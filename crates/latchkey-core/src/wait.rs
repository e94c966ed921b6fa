//! Poll a condition until it holds.
//!
//! Used where a peripheral offers only a level (the presence sensor) and no
//! edge notification. The poll interval bounds how late a change is noticed.

use std::time::Duration;

use thiserror::Error;

use crate::env::Environment;

/// Shortest poll interval accepted; anything lower is raised to this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polling cadence and optional deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Sleep between checks.
    pub poll_interval: Duration,
    /// Give up after this long. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self { poll_interval: Duration::from_millis(50), timeout: None }
    }
}

/// Errors from [`wait_until`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WaitError {
    /// Condition still false when the deadline passed.
    #[error("condition not met within {0:?}")]
    TimedOut(Duration),
}

/// Suspend until `condition` returns true. Returns how long it took.
///
/// The condition is checked immediately, then once per poll interval.
pub async fn wait_until<E, F>(
    env: &E,
    policy: WaitPolicy,
    mut condition: F,
) -> Result<Duration, WaitError>
where
    E: Environment,
    F: FnMut() -> bool + Send,
{
    let poll = policy.poll_interval.max(MIN_POLL_INTERVAL);
    let start = env.now();

    loop {
        if condition() {
            return Ok(env.now().saturating_duration_since(start));
        }
        if let Some(timeout) = policy.timeout {
            if env.now().saturating_duration_since(start) >= timeout {
                return Err(WaitError::TimedOut(timeout));
            }
        }
        env.sleep(poll).await;
    }
}

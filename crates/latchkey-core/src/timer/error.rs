//! Timer configuration and arming errors.

use thiserror::Error;

use super::{Prescaler, TimerId, TimerMode};

/// Errors from timer configuration, tick computation and arming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TimerError {
    /// Prescaler is `Disabled`; the counter would never advance.
    #[error("timer clock is disabled")]
    ClockDisabled,

    /// Divider missing from this timer's clock-select table.
    #[error("prescaler {prescaler:?} is not available on {timer:?}")]
    UnsupportedPrescaler {
        /// Requested divider.
        prescaler: Prescaler,
        /// Timer it was requested for.
        timer: TimerId,
    },

    /// Requested a zero-length interval.
    #[error("duration must be positive")]
    ZeroDuration,

    /// CPU clock frequency of zero.
    #[error("clock frequency must be positive")]
    ZeroClock,

    /// Counter width outside 1..=32 bits.
    #[error("unsupported counter width: {0} bits")]
    UnsupportedWidth(u32),

    /// Mode leaves zero counter increments per event.
    #[error("empty counting range: {0:?}")]
    EmptyCountRange(TimerMode),

    /// Compare value does not fit the counter.
    #[error("compare value {compare} does not fit a {width_bits}-bit counter")]
    CompareOutOfRange {
        /// Compare register value.
        compare: u16,
        /// Counter width.
        width_bits: u32,
    },

    /// Tick count or event period does not fit 64 bits.
    #[error("tick count overflow")]
    TickOverflow,

    /// Tried to arm a timer that already has an active arming.
    #[error("timer is already armed")]
    AlreadyArmed,

    /// Waited on a timer with no active arming.
    #[error("timer is not armed")]
    NotArmed,

    /// Arming with zero ticks would expire before it starts.
    #[error("tick count must be positive")]
    ZeroTicks,

    /// Hardware port needs a tokio runtime and none is running.
    #[error("no async runtime available to drive the timer")]
    NoRuntime,
}

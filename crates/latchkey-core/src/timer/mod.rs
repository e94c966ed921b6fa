//! Interval timer abstraction.
//!
//! Converts a wall-clock duration into the number of hardware timer events
//! (overflows or compare matches) needed to cover it, for whatever prescaler
//! and counting mode a timer is configured with, and turns those events into
//! a single expiry signal.
//!
//! ```text
//! increments per event   overflow: 2^width - initial
//!                        compare:  compare - initial
//! ticks                  ceil(duration * clock_hz / divider / increments)
//! ```
//!
//! # Components
//!
//! - [`compute_ticks`]: the pure conversion
//! - [`IntervalTimer`]: arming, expiry waiting, disarming
//! - [`TimerHardware`]: port to the interrupt source
//! - [`TokioTimer`]: interrupt source driven by a tokio task
//! - [`ManualTimer`]: interrupt source fired explicitly by tests

mod error;
mod interval;
mod manual;
mod tokio_timer;

use std::time::Duration;

pub use error::TimerError;
pub use interval::{IntervalTimer, TickCallback, TimerHardware};
pub use manual::ManualTimer;
pub use tokio_timer::TokioTimer;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// CPU clock the original boards run at.
pub const DEFAULT_CLOCK_HZ: u32 = 8_000_000;

/// Hardware timer selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// 8-bit timer.
    Timer0,
    /// 16-bit timer.
    Timer1,
    /// 8-bit timer with the extended prescaler set.
    Timer2,
}

impl TimerId {
    /// All timers, in index order.
    pub const ALL: [Self; 3] = [Self::Timer0, Self::Timer1, Self::Timer2];

    /// Counter width in bits.
    pub const fn width_bits(self) -> u32 {
        match self {
            Self::Timer1 => 16,
            Self::Timer0 | Self::Timer2 => 8,
        }
    }

    /// Slot index for per-timer tables.
    pub const fn index(self) -> usize {
        match self {
            Self::Timer0 => 0,
            Self::Timer1 => 1,
            Self::Timer2 => 2,
        }
    }
}

/// Clock divider applied to the CPU clock before it reaches the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prescaler {
    /// Counter clock stopped. Never expires, so always rejected.
    Disabled,
    /// No scaling.
    Div1,
    /// clk/8
    Div8,
    /// clk/32 (Timer2 only)
    Div32,
    /// clk/64
    Div64,
    /// clk/128 (Timer2 only)
    Div128,
    /// clk/256
    Div256,
    /// clk/1024
    Div1024,
}

impl Prescaler {
    /// Division ratio, or `None` for a stopped clock.
    pub const fn divisor(self) -> Option<u32> {
        match self {
            Self::Disabled => None,
            Self::Div1 => Some(1),
            Self::Div8 => Some(8),
            Self::Div32 => Some(32),
            Self::Div64 => Some(64),
            Self::Div128 => Some(128),
            Self::Div256 => Some(256),
            Self::Div1024 => Some(1024),
        }
    }

    /// Whether `timer` has this divider in its clock-select table.
    pub const fn is_supported_by(self, timer: TimerId) -> bool {
        match self {
            Self::Div32 | Self::Div128 => matches!(timer, TimerId::Timer2),
            _ => true,
        }
    }
}

/// Counting mode, with the register values that bound one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerMode {
    /// Free-running; one event per rollover from `initial` past the top.
    Overflow {
        /// Counter preload.
        initial: u16,
    },
    /// Clear-on-compare; one event each time the counter reaches `compare`.
    CompareMatch {
        /// Counter preload.
        initial: u16,
        /// Compare register value.
        compare: u16,
    },
}

/// Full configuration of one hardware timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    /// Which timer.
    pub timer: TimerId,
    /// Clock divider.
    pub prescaler: Prescaler,
    /// Counting mode.
    pub mode: TimerMode,
    /// CPU clock feeding the prescaler.
    pub clock_hz: u32,
}

impl Default for TimerConfig {
    /// Timer2, clk/256, free-running from zero at 8 MHz.
    fn default() -> Self {
        Self {
            timer: TimerId::Timer2,
            prescaler: Prescaler::Div256,
            mode: TimerMode::Overflow { initial: 0 },
            clock_hz: DEFAULT_CLOCK_HZ,
        }
    }
}

impl TimerConfig {
    /// Check everything that does not depend on the requested duration.
    pub fn validate(&self) -> Result<(), TimerError> {
        if !self.prescaler.is_supported_by(self.timer) {
            return Err(TimerError::UnsupportedPrescaler {
                prescaler: self.prescaler,
                timer: self.timer,
            });
        }
        divisor(self.prescaler)?;
        if self.clock_hz == 0 {
            return Err(TimerError::ZeroClock);
        }
        increments_per_event(self.mode, self.timer.width_bits())?;
        Ok(())
    }

    /// Ticks needed to cover `duration` with this configuration.
    pub fn ticks_for(&self, duration: Duration) -> Result<u64, TimerError> {
        self.validate()?;
        compute_ticks(duration, self.clock_hz, self.prescaler, self.mode, self.timer.width_bits())
    }

    /// Real time between two consecutive hardware events.
    pub fn event_period(&self) -> Result<Duration, TimerError> {
        self.validate()?;
        let counts = u128::from(divisor(self.prescaler)?)
            * u128::from(increments_per_event(self.mode, self.timer.width_bits())?);
        let nanos = (counts * NANOS_PER_SEC).div_ceil(u128::from(self.clock_hz));
        u64::try_from(nanos).map(Duration::from_nanos).map_err(|_| TimerError::TickOverflow)
    }
}

/// Number of hardware events needed to cover `duration`.
///
/// Rounds up, so the countdown never expires early. Fails fast on any
/// configuration that could never expire or would expire immediately:
/// a stopped clock, a zero duration, or an empty counting range.
pub fn compute_ticks(
    duration: Duration,
    clock_hz: u32,
    prescaler: Prescaler,
    mode: TimerMode,
    width_bits: u32,
) -> Result<u64, TimerError> {
    let divisor = divisor(prescaler)?;
    if clock_hz == 0 {
        return Err(TimerError::ZeroClock);
    }
    if duration.is_zero() {
        return Err(TimerError::ZeroDuration);
    }
    let increments = increments_per_event(mode, width_bits)?;

    let numerator = duration.as_nanos() * u128::from(clock_hz);
    let denominator = NANOS_PER_SEC * u128::from(divisor) * u128::from(increments);
    let ticks = numerator.div_ceil(denominator);

    u64::try_from(ticks).map_err(|_| TimerError::TickOverflow)
}

fn divisor(prescaler: Prescaler) -> Result<u32, TimerError> {
    prescaler.divisor().ok_or(TimerError::ClockDisabled)
}

fn increments_per_event(mode: TimerMode, width_bits: u32) -> Result<u64, TimerError> {
    if width_bits == 0 || width_bits > 32 {
        return Err(TimerError::UnsupportedWidth(width_bits));
    }
    let top = 1u64 << width_bits;

    let increments = match mode {
        TimerMode::Overflow { initial } => top.saturating_sub(u64::from(initial)),
        TimerMode::CompareMatch { initial, compare } => {
            if u64::from(compare) >= top {
                return Err(TimerError::CompareOutOfRange { compare, width_bits });
            }
            u64::from(compare).saturating_sub(u64::from(initial))
        },
    };

    if increments == 0 {
        return Err(TimerError::EmptyCountRange(mode));
    }
    Ok(increments)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const OVERFLOW: TimerMode = TimerMode::Overflow { initial: 0 };

    #[test]
    fn door_and_lockout_ticks_at_default_config() {
        let config = TimerConfig::default();
        // 15 s * 8 MHz / 256 / 256 = 1831.05
        assert_eq!(config.ticks_for(Duration::from_secs(15)).unwrap(), 1832);
        // 60 s * 8 MHz / 256 / 256 = 7324.2
        assert_eq!(config.ticks_for(Duration::from_secs(60)).unwrap(), 7325);
    }

    #[test]
    fn exact_division_does_not_round_up() {
        let mode = TimerMode::CompareMatch { initial: 0, compare: 250 };
        // 8 MHz / 64 / 250 = 500 events per second
        let ticks = compute_ticks(Duration::from_secs(1), 8_000_000, Prescaler::Div64, mode, 8);
        assert_eq!(ticks.unwrap(), 500);
    }

    #[test]
    fn overflow_preload_shortens_each_event() {
        let full = compute_ticks(Duration::from_secs(1), 1_000_000, Prescaler::Div1, OVERFLOW, 16);
        let preloaded = compute_ticks(
            Duration::from_secs(1),
            1_000_000,
            Prescaler::Div1,
            TimerMode::Overflow { initial: u16::MAX - 999 },
            16,
        );
        // 1e6 / 65536 = 15.26 -> 16; 1e6 / 1000 = 1000
        assert_eq!(full.unwrap(), 16);
        assert_eq!(preloaded.unwrap(), 1000);
    }

    #[test]
    fn disabled_clock_is_rejected() {
        let ticks = compute_ticks(Duration::from_secs(1), 8_000_000, Prescaler::Disabled, OVERFLOW, 8);
        assert_eq!(ticks, Err(TimerError::ClockDisabled));

        let config = TimerConfig { prescaler: Prescaler::Disabled, ..TimerConfig::default() };
        assert_eq!(config.validate(), Err(TimerError::ClockDisabled));
    }

    #[test]
    fn zero_duration_is_rejected() {
        let ticks = compute_ticks(Duration::ZERO, 8_000_000, Prescaler::Div8, OVERFLOW, 8);
        assert_eq!(ticks, Err(TimerError::ZeroDuration));
    }

    #[test]
    fn empty_count_ranges_are_rejected() {
        let compare_below_initial = TimerMode::CompareMatch { initial: 100, compare: 100 };
        assert!(matches!(
            compute_ticks(Duration::from_secs(1), 8_000_000, Prescaler::Div8, compare_below_initial, 8),
            Err(TimerError::EmptyCountRange(_))
        ));

        let preload_past_top = TimerMode::Overflow { initial: 256 };
        assert!(matches!(
            compute_ticks(Duration::from_secs(1), 8_000_000, Prescaler::Div8, preload_past_top, 8),
            Err(TimerError::EmptyCountRange(_))
        ));

        let compare_too_wide = TimerMode::CompareMatch { initial: 0, compare: 300 };
        assert!(matches!(
            compute_ticks(Duration::from_secs(1), 8_000_000, Prescaler::Div8, compare_too_wide, 8),
            Err(TimerError::CompareOutOfRange { compare: 300, width_bits: 8 })
        ));
    }

    #[test]
    fn timer2_only_prescalers() {
        for timer in TimerId::ALL {
            let config = TimerConfig { timer, prescaler: Prescaler::Div128, ..TimerConfig::default() };
            assert_eq!(config.validate().is_ok(), timer == TimerId::Timer2, "{timer:?}");
        }
    }

    #[test]
    fn event_period_at_default_config() {
        // 256 * 256 / 8 MHz = 8.192 ms
        assert_eq!(TimerConfig::default().event_period().unwrap(), Duration::from_micros(8192));
    }

    proptest! {
        /// Ticks always cover the requested duration, and one tick fewer never does.
        #[test]
        fn prop_ticks_are_minimal_cover(
            millis in 1u64..600_000,
            clock_hz in 1_000u32..20_000_000,
            prescaler in prop::sample::select(vec![
                Prescaler::Div1, Prescaler::Div8, Prescaler::Div64, Prescaler::Div256, Prescaler::Div1024,
            ]),
            initial in 0u16..255,
        ) {
            let duration = Duration::from_millis(millis);
            let mode = TimerMode::Overflow { initial };
            let ticks = compute_ticks(duration, clock_hz, prescaler, mode, 8).unwrap();
            prop_assert!(ticks >= 1);

            let per_event = u128::from(prescaler.divisor().unwrap()) * u128::from(256 - u64::from(initial));
            let counts_needed = duration.as_nanos() * u128::from(clock_hz);
            let covered = |t: u64| u128::from(t) * per_event * NANOS_PER_SEC >= counts_needed;

            prop_assert!(covered(ticks));
            prop_assert!(!covered(ticks - 1));
        }
    }
}

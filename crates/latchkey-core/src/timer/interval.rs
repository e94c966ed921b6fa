//! Countdown over hardware timer events.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::sync::mpsc;

use super::{TimerConfig, TimerError, TimerId};

/// Invoked once per hardware event (overflow or compare match).
pub type TickCallback = Arc<dyn Fn() + Send + Sync>;

/// Port to a hardware interrupt source.
///
/// Implementations call the callback once per event of the configured timer
/// until `disarm` is called for that timer.
pub trait TimerHardware: Send {
    /// Program the timer and start delivering events to `on_tick`.
    fn arm(&mut self, config: &TimerConfig, on_tick: TickCallback) -> Result<(), TimerError>;

    /// Stop the timer. No-op if it is not running.
    fn disarm(&mut self, timer: TimerId);
}

/// Shared between the interrupt callback and the waiter.
///
/// `count` is only written by the callback. Expiry is delivered through a
/// capacity-1 channel, so the waiter never shares a lock with the callback.
struct ExpiryLatch {
    target: u64,
    count: AtomicU64,
    live: AtomicBool,
    expired: mpsc::Sender<()>,
}

impl ExpiryLatch {
    fn tick(&self) {
        if !self.live.load(Ordering::Acquire) {
            return;
        }
        let seen = self.count.fetch_add(1, Ordering::AcqRel) + 1;
        if seen >= self.target {
            self.count.store(0, Ordering::Release);
            // One expiry per arming: later events of this arming are dropped.
            if self.live.swap(false, Ordering::AcqRel) {
                let _ = self.expired.try_send(());
            }
        }
    }
}

struct Arming {
    latch: Arc<ExpiryLatch>,
    expiry: mpsc::Receiver<()>,
    fired: bool,
}

/// One countdown timer: computes ticks, arms the hardware, reports expiry.
///
/// # Invariants
///
/// - At most one active arming. Arming again before `disarm` is an error.
/// - Expiry is signalled exactly once, after exactly `ticks` events.
/// - No expiry is observed after `disarm` returns.
pub struct IntervalTimer<H> {
    config: TimerConfig,
    hardware: H,
    arming: Option<Arming>,
}

impl<H: TimerHardware> IntervalTimer<H> {
    /// Wrap `hardware`, rejecting an unusable configuration up front.
    pub fn new(config: TimerConfig, hardware: H) -> Result<Self, TimerError> {
        config.validate()?;
        Ok(Self { config, hardware, arming: None })
    }

    /// Configuration this timer was built with.
    pub const fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Underlying hardware port.
    pub const fn hardware(&self) -> &H {
        &self.hardware
    }

    /// Ticks needed for `duration`.
    pub fn ticks_for(&self, duration: Duration) -> Result<u64, TimerError> {
        self.config.ticks_for(duration)
    }

    /// Start a countdown of `ticks` hardware events.
    pub fn arm(&mut self, ticks: u64) -> Result<(), TimerError> {
        if self.arming.is_some() {
            return Err(TimerError::AlreadyArmed);
        }
        if ticks == 0 {
            return Err(TimerError::ZeroTicks);
        }

        let (expired, expiry) = mpsc::channel(1);
        let latch = Arc::new(ExpiryLatch {
            target: ticks,
            count: AtomicU64::new(0),
            live: AtomicBool::new(true),
            expired,
        });

        let on_tick = Arc::clone(&latch);
        self.hardware.arm(&self.config, Arc::new(move || on_tick.tick()))?;
        self.arming = Some(Arming { latch, expiry, fired: false });

        tracing::debug!(timer = ?self.config.timer, ticks, "timer armed");
        Ok(())
    }

    /// Start a countdown covering `duration`. Returns the tick count used.
    pub fn arm_for(&mut self, duration: Duration) -> Result<u64, TimerError> {
        let ticks = self.ticks_for(duration)?;
        self.arm(ticks)?;
        Ok(ticks)
    }

    /// True while an arming is active (expired or not).
    pub const fn is_armed(&self) -> bool {
        self.arming.is_some()
    }

    /// Non-blocking expiry check for the current arming.
    pub fn is_expired(&mut self) -> bool {
        let Some(arming) = self.arming.as_mut() else {
            return false;
        };
        if !arming.fired && arming.expiry.try_recv().is_ok() {
            arming.fired = true;
        }
        arming.fired
    }

    /// Suspend until the current arming expires.
    pub async fn wait_expiry(&mut self) -> Result<(), TimerError> {
        let arming = self.arming.as_mut().ok_or(TimerError::NotArmed)?;
        if arming.fired {
            return Ok(());
        }
        // The sender lives in the latch this arming holds, so `None` cannot
        // be observed while the arming exists.
        arming.expiry.recv().await.ok_or(TimerError::NotArmed)?;
        arming.fired = true;
        Ok(())
    }

    /// Stop the countdown. Returns whether an arming was active.
    pub fn disarm(&mut self) -> bool {
        let Some(arming) = self.arming.take() else {
            return false;
        };
        arming.latch.live.store(false, Ordering::Release);
        self.hardware.disarm(self.config.timer);
        tracing::debug!(timer = ?self.config.timer, fired = arming.fired, "timer disarmed");
        true
    }

    /// Arm for `duration`, wait for expiry, disarm.
    ///
    /// The timer is disarmed even when waiting fails.
    pub async fn dwell(&mut self, duration: Duration) -> Result<(), TimerError> {
        let ticks = self.arm_for(duration)?;
        tracing::trace!(?duration, ticks, "dwell started");
        let waited = self.wait_expiry().await;
        self.disarm();
        waited
    }
}

impl<H> std::fmt::Debug for IntervalTimer<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalTimer")
            .field("config", &self.config)
            .field("armed", &self.arming.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::timer::{ManualTimer, Prescaler, TimerMode, TokioTimer};

    fn manual() -> (IntervalTimer<ManualTimer>, ManualTimer) {
        let hardware = ManualTimer::new();
        let timer = IntervalTimer::new(TimerConfig::default(), hardware.clone()).unwrap();
        (timer, hardware)
    }

    #[test]
    fn expires_after_exactly_n_ticks() {
        let (mut timer, hardware) = manual();
        timer.arm(5).unwrap();

        hardware.fire_n(TimerId::Timer2, 4);
        assert!(!timer.is_expired());

        hardware.fire(TimerId::Timer2);
        assert!(timer.is_expired());
    }

    #[test]
    fn extra_ticks_do_not_signal_again() {
        let (mut timer, hardware) = manual();
        timer.arm(2).unwrap();
        hardware.fire_n(TimerId::Timer2, 6);
        assert!(timer.is_expired());
        assert!(timer.is_expired());
        assert!(timer.disarm());
    }

    #[test]
    fn disarm_mid_count_never_expires() {
        let (mut timer, hardware) = manual();
        timer.arm(3).unwrap();
        hardware.fire_n(TimerId::Timer2, 2);
        assert!(timer.disarm());
        assert!(!hardware.is_armed(TimerId::Timer2));

        // Nothing delivered after disarm, even if the source misbehaves.
        assert!(!hardware.fire(TimerId::Timer2));
        assert!(!timer.is_expired());
        assert!(!timer.disarm());
    }

    #[test]
    fn second_arming_is_rejected() {
        let (mut timer, _hardware) = manual();
        timer.arm(3).unwrap();
        assert_eq!(timer.arm(3), Err(TimerError::AlreadyArmed));
        timer.disarm();
        assert!(timer.arm(3).is_ok());
    }

    #[test]
    fn rearm_starts_a_fresh_count() {
        let (mut timer, hardware) = manual();
        timer.arm(3).unwrap();
        hardware.fire_n(TimerId::Timer2, 2);
        timer.disarm();

        timer.arm(3).unwrap();
        hardware.fire_n(TimerId::Timer2, 2);
        assert!(!timer.is_expired());
        hardware.fire(TimerId::Timer2);
        assert!(timer.is_expired());
        assert_eq!(hardware.arm_count(TimerId::Timer2), 2);
    }

    #[test]
    fn zero_ticks_rejected() {
        let (mut timer, _hardware) = manual();
        assert_eq!(timer.arm(0), Err(TimerError::ZeroTicks));
        assert!(!timer.is_armed());
    }

    #[test]
    fn misconfiguration_rejected_at_construction() {
        let disabled = TimerConfig { prescaler: Prescaler::Disabled, ..TimerConfig::default() };
        assert_eq!(
            IntervalTimer::new(disabled, ManualTimer::new()).map(|_| ()),
            Err(TimerError::ClockDisabled)
        );

        let empty = TimerConfig {
            mode: TimerMode::CompareMatch { initial: 10, compare: 5 },
            ..TimerConfig::default()
        };
        assert!(IntervalTimer::new(empty, ManualTimer::new()).is_err());

        let (timer, _hardware) = manual();
        assert_eq!(timer.ticks_for(Duration::ZERO), Err(TimerError::ZeroDuration));
    }

    #[tokio::test]
    async fn wait_expiry_resolves_after_fire() {
        let (mut timer, hardware) = manual();
        assert_eq!(timer.wait_expiry().await, Err(TimerError::NotArmed));

        timer.arm(2).unwrap();
        let firing = tokio::spawn(async move {
            hardware.fire(TimerId::Timer2);
            tokio::task::yield_now().await;
            hardware.fire(TimerId::Timer2);
        });
        timer.wait_expiry().await.unwrap();
        firing.await.unwrap();
        timer.disarm();
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_dwell_covers_duration() {
        let mut timer = IntervalTimer::new(TimerConfig::default(), TokioTimer::new()).unwrap();
        let start = tokio::time::Instant::now();

        timer.dwell(Duration::from_secs(15)).await.unwrap();

        let elapsed = start.elapsed();
        // 1832 events of 8.192 ms
        assert!(elapsed >= Duration::from_secs(15), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(15_100), "{elapsed:?}");
        assert!(!timer.is_armed());
    }

    fn any_config() -> impl Strategy<Value = TimerConfig> {
        (
            prop::sample::select(TimerId::ALL.to_vec()),
            prop::sample::select(vec![
                Prescaler::Div1,
                Prescaler::Div8,
                Prescaler::Div32,
                Prescaler::Div64,
                Prescaler::Div128,
                Prescaler::Div256,
                Prescaler::Div1024,
            ]),
            any::<bool>(),
            any::<u16>(),
            any::<u16>(),
            1_000u32..=20_000_000,
        )
            .prop_map(|(timer, prescaler, compare_match, raw_initial, raw_compare, clock_hz)| {
                let top = 1u32 << timer.width_bits();
                let initial = u32::from(raw_initial) % top;
                let mode = if compare_match && initial + 1 < top {
                    let compare = initial + 1 + u32::from(raw_compare) % (top - 1 - initial);
                    TimerMode::CompareMatch {
                        initial: u16::try_from(initial).unwrap(),
                        compare: u16::try_from(compare).unwrap(),
                    }
                } else {
                    TimerMode::Overflow { initial: u16::try_from(initial).unwrap() }
                };
                TimerConfig { timer, prescaler, mode, clock_hz }
            })
    }

    proptest! {
        /// A countdown armed for any duration stays pending through
        /// `ticks - 1` hardware events and expires on the next one.
        #[test]
        fn prop_arm_for_expires_on_last_tick(
            config in any_config(),
            periods in 0.01f64..2000.0,
        ) {
            prop_assume!(config.prescaler.is_supported_by(config.timer));
            let duration = config.event_period().unwrap().mul_f64(periods);
            prop_assume!(!duration.is_zero());

            let hardware = ManualTimer::new();
            let mut timer = IntervalTimer::new(config, hardware.clone()).unwrap();
            let ticks = timer.arm_for(duration).unwrap();
            prop_assert!(ticks >= 1);
            // event periods round up to whole nanoseconds, so allow some slack
            prop_assert!(ticks <= 4096, "{ticks} ticks for {periods} periods");

            let pending = u32::try_from(ticks - 1).unwrap();
            prop_assert_eq!(hardware.fire_n(config.timer, pending), pending);
            prop_assert!(!timer.is_expired());

            prop_assert!(hardware.fire(config.timer));
            prop_assert!(timer.is_expired());
            prop_assert!(timer.disarm());
            prop_assert!(!hardware.is_armed(config.timer));
        }
    }
}

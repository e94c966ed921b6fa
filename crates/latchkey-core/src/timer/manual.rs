//! Test interrupt source fired by hand.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{TickCallback, TimerConfig, TimerError, TimerHardware, TimerId};

#[derive(Default)]
struct Slots {
    callbacks: [Option<TickCallback>; 3],
    arm_counts: [u32; 3],
}

/// Hardware port whose events are delivered only by [`ManualTimer::fire`].
///
/// Clones share state, so a test can keep one handle while the
/// [`IntervalTimer`](super::IntervalTimer) owns another.
#[derive(Clone, Default)]
pub struct ManualTimer {
    slots: Arc<Mutex<Slots>>,
}

impl ManualTimer {
    /// No timers armed.
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver one event. Returns false if `timer` is not armed.
    pub fn fire(&self, timer: TimerId) -> bool {
        // Callback runs outside the lock so it may re-enter the port.
        let callback = self.slots().callbacks[timer.index()].clone();
        let Some(on_tick) = callback else {
            return false;
        };
        on_tick();
        true
    }

    /// Deliver `n` events. Returns how many reached an armed timer.
    pub fn fire_n(&self, timer: TimerId, n: u32) -> u32 {
        (0..n).map(|_| u32::from(self.fire(timer))).sum()
    }

    /// Whether `timer` currently has a callback installed.
    pub fn is_armed(&self, timer: TimerId) -> bool {
        self.slots().callbacks[timer.index()].is_some()
    }

    /// How many times `timer` has been armed.
    pub fn arm_count(&self, timer: TimerId) -> u32 {
        self.slots().arm_counts[timer.index()]
    }
}

impl TimerHardware for ManualTimer {
    fn arm(&mut self, config: &TimerConfig, on_tick: TickCallback) -> Result<(), TimerError> {
        let index = config.timer.index();
        let mut slots = self.slots();
        if slots.callbacks[index].is_some() {
            return Err(TimerError::AlreadyArmed);
        }
        slots.callbacks[index] = Some(on_tick);
        slots.arm_counts[index] += 1;
        Ok(())
    }

    fn disarm(&mut self, timer: TimerId) {
        self.slots().callbacks[timer.index()] = None;
    }
}

impl std::fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots();
        f.debug_struct("ManualTimer")
            .field("armed", &slots.callbacks.each_ref().map(Option::is_some))
            .field("arm_counts", &slots.arm_counts)
            .finish()
    }
}

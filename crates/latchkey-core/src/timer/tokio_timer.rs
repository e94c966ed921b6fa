//! Timer events from a tokio task.

use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use super::{TickCallback, TimerConfig, TimerError, TimerHardware, TimerId};

/// Stands in for the interrupt source with one ticking task per armed timer.
///
/// The task fires at the configuration's event period, so a countdown takes
/// the same wall-clock (or simulated) time as on the real counter. Must be
/// armed from within a tokio runtime.
#[derive(Debug, Default)]
pub struct TokioTimer {
    tasks: [Option<JoinHandle<()>>; 3],
}

impl TokioTimer {
    /// No timers running.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimerHardware for TokioTimer {
    fn arm(&mut self, config: &TimerConfig, on_tick: TickCallback) -> Result<(), TimerError> {
        let slot = &mut self.tasks[config.timer.index()];
        if slot.is_some() {
            return Err(TimerError::AlreadyArmed);
        }

        let period = config.event_period()?;
        let runtime = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;

        *slot = Some(runtime.spawn(async move {
            let mut events = tokio::time::interval_at(Instant::now() + period, period);
            // Late events are delivered back to back, like queued interrupts.
            events.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                events.tick().await;
                on_tick();
            }
        }));
        Ok(())
    }

    fn disarm(&mut self, timer: TimerId) {
        if let Some(task) = self.tasks[timer.index()].take() {
            task.abort();
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for task in self.tasks.iter_mut().filter_map(Option::take) {
            task.abort();
        }
    }
}

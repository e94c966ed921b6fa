//! Control node driver.
//!
//! Executes [`ControlEngine`] actions against the link, the dwell timer and
//! the door peripherals, and blocks on whichever input the engine awaits.

use latchkey_core::{
    Environment, SessionState,
    hal::{Actuator, Alarm, CredentialStore, PresenceSensor},
    link::{Link, LinkError},
    timer::{IntervalTimer, TimerHardware},
    wait::{WaitError, wait_until},
};

use crate::{
    engine::{ControlAction, ControlAwait, ControlConfig, ControlEngine, ControlEvent},
    error::ControlError,
};

/// Door-side peripherals owned by the Control node.
pub struct ControlPeripherals {
    /// Door motor.
    pub actuator: Box<dyn Actuator>,
    /// Lockout buzzer.
    pub alarm: Box<dyn Alarm>,
    /// Doorway sensor.
    pub presence: Box<dyn PresenceSensor>,
}

impl std::fmt::Debug for ControlPeripherals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPeripherals").finish_non_exhaustive()
    }
}

/// One running Control node.
///
/// Runs a single sequential flow: at most one of link receive, dwell or
/// presence wait is pending at any time.
pub struct ControlNode<E, S, L, H> {
    env: E,
    engine: ControlEngine<S>,
    link: L,
    timer: IntervalTimer<H>,
    peripherals: ControlPeripherals,
}

impl<E, S, L, H> ControlNode<E, S, L, H>
where
    E: Environment,
    S: CredentialStore,
    L: Link,
    H: TimerHardware,
{
    /// Assemble a node.
    ///
    /// # Errors
    ///
    /// Fails if the timer configuration cannot express the configured door
    /// or lockout dwell.
    pub fn new(
        env: E,
        store: S,
        link: L,
        hardware: H,
        peripherals: ControlPeripherals,
        config: ControlConfig,
    ) -> Result<Self, ControlError> {
        let timer = IntervalTimer::new(config.timer, hardware)?;
        let door_ticks = timer.ticks_for(config.timing.door_dwell)?;
        let lockout_ticks = timer.ticks_for(config.timing.lockout_dwell)?;
        tracing::debug!(door_ticks, lockout_ticks, timer = ?config.timer.timer, "dwell timer ready");

        Ok(Self { env, engine: ControlEngine::new(store, config), link, timer, peripherals })
    }

    /// Current session state.
    pub const fn state(&self) -> SessionState {
        self.engine.state()
    }

    /// Protocol engine.
    pub const fn engine(&self) -> &ControlEngine<S> {
        &self.engine
    }

    /// Wait for the next input, feed it to the engine, execute the result.
    ///
    /// # Errors
    ///
    /// Any [`ControlError`]; see [`ControlError::is_fatal`].
    pub async fn step(&mut self) -> Result<(), ControlError> {
        let event = match self.engine.awaiting() {
            ControlAwait::Link => ControlEvent::Byte(self.link.recv_byte().await?),
            ControlAwait::Dwell(duration) => {
                self.timer.dwell(duration).await?;
                ControlEvent::DwellElapsed
            },
            ControlAwait::PresenceClear => {
                self.wait_for_clear().await;
                ControlEvent::PresenceCleared
            },
        };

        let actions = self.engine.handle(event)?;
        self.execute(actions).await
    }

    /// Run until the HMI hangs up or a fatal error occurs.
    ///
    /// # Errors
    ///
    /// Every error except the peer closing the link.
    pub async fn run(&mut self) -> Result<(), ControlError> {
        tracing::info!(state = %self.engine.state(), "control node running");
        loop {
            match self.step().await {
                Ok(()) => {},
                Err(ControlError::Link(LinkError::Closed)) => {
                    tracing::info!(state = %self.engine.state(), "hmi disconnected");
                    return Ok(());
                },
                Err(err) => {
                    tracing::error!(state = %self.engine.state(), %err, "control node halted");
                    return Err(err);
                },
            }
        }
    }

    async fn execute(&mut self, actions: Vec<ControlAction>) -> Result<(), ControlError> {
        for action in actions {
            match action {
                ControlAction::Send(bytes) => self.link.send_all(&bytes).await?,
                ControlAction::Drive { direction, power } => {
                    self.peripherals.actuator.drive(direction, power);
                },
                ControlAction::AlarmOn => self.peripherals.alarm.on(),
                ControlAction::AlarmOff => self.peripherals.alarm.off(),
            }
        }
        Ok(())
    }

    async fn wait_for_clear(&mut self) {
        let policy = self.engine.config().presence_wait;
        let Self { env, peripherals, .. } = self;

        loop {
            match wait_until(env, policy, || !peripherals.presence.is_detected()).await {
                Ok(waited) => {
                    tracing::debug!(?waited, "doorway cleared");
                    return;
                },
                Err(WaitError::TimedOut(limit)) => {
                    tracing::warn!(?limit, "doorway still occupied");
                },
            }
        }
    }
}

impl<E, S, L, H> std::fmt::Debug for ControlNode<E, S, L, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlNode")
            .field("engine", &self.engine)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use latchkey_core::{
        ProtocolTiming, SystemEnv,
        hal::{Direction, MemoryCredentialStore},
        link::StreamLink,
        timer::TokioTimer,
    };
    use latchkey_proto::{LinkCode, Passcode, encode_candidate};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[derive(Clone, Default)]
    struct Log(Arc<Mutex<Vec<String>>>);

    impl Log {
        fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Actuator for Log {
        fn drive(&mut self, direction: Direction, _power: u8) {
            self.push(format!("{direction:?}"));
        }
    }

    impl Alarm for Log {
        fn on(&mut self) {
            self.push("alarm-on".into());
        }

        fn off(&mut self) {
            self.push("alarm-off".into());
        }
    }

    struct ClearsAfter(u32);

    impl PresenceSensor for ClearsAfter {
        fn is_detected(&mut self) -> bool {
            self.0 = self.0.saturating_sub(1);
            self.0 > 0
        }
    }

    fn config() -> ControlConfig {
        ControlConfig {
            timing: ProtocolTiming {
                door_dwell: Duration::from_secs(2),
                lockout_dwell: Duration::from_secs(5),
            },
            resume_enrolled: true,
            ..ControlConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn door_cycle_over_stream_link() {
        let (hmi, control) = tokio::io::duplex(64);
        let log = Log::default();
        let peripherals = ControlPeripherals {
            actuator: Box::new(log.clone()),
            alarm: Box::new(log.clone()),
            presence: Box::new(ClearsAfter(4)),
        };
        let credential = Passcode::from_bytes([2, 4, 6, 8, 0]).unwrap();
        let mut node = ControlNode::new(
            SystemEnv,
            MemoryCredentialStore::with_passcode(&credential),
            StreamLink::new(control),
            TokioTimer::new(),
            peripherals,
            config(),
        )
        .unwrap();

        let peer = tokio::spawn(async move {
            let mut hmi = hmi;
            hmi.write_all(&[LinkCode::OpenDoor.to_u8()]).await.unwrap();
            hmi.write_all(&encode_candidate(&credential)).await.unwrap();

            let mut reply = [0u8; 4];
            hmi.read_exact(&mut reply).await.unwrap();
            reply
        });

        let start = tokio::time::Instant::now();
        while node.state() != SessionState::DoorCycle {
            node.step().await.unwrap();
        }
        while node.state() != SessionState::Idle {
            node.step().await.unwrap();
        }

        // Outcome, then people-clear.
        assert_eq!(peer.await.unwrap(), [0x01, 0x00, 0x01, 0x06]);
        assert_eq!(log.entries(), vec!["Open", "Stop", "Close", "Stop"]);
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn peer_hangup_ends_run_cleanly() {
        let (hmi, control) = tokio::io::duplex(64);
        let log = Log::default();
        let peripherals = ControlPeripherals {
            actuator: Box::new(log.clone()),
            alarm: Box::new(log),
            presence: Box::new(ClearsAfter(0)),
        };
        let mut node = ControlNode::new(
            SystemEnv,
            MemoryCredentialStore::blank(),
            StreamLink::new(control),
            TokioTimer::new(),
            peripherals,
            ControlConfig::default(),
        )
        .unwrap();

        drop(hmi);
        node.run().await.unwrap();
        assert_eq!(node.state(), SessionState::AwaitingEnrollment);
    }

    #[tokio::test(start_paused = true)]
    async fn desync_halts_with_error() {
        let (mut hmi, control) = tokio::io::duplex(64);
        let log = Log::default();
        let peripherals = ControlPeripherals {
            actuator: Box::new(log.clone()),
            alarm: Box::new(log),
            presence: Box::new(ClearsAfter(0)),
        };
        let mut node = ControlNode::new(
            SystemEnv,
            MemoryCredentialStore::blank(),
            StreamLink::new(control),
            TokioTimer::new(),
            peripherals,
            ControlConfig::default(),
        )
        .unwrap();

        hmi.write_all(&[LinkCode::NoPeople.to_u8()]).await.unwrap();
        let err = node.run().await.unwrap_err();
        assert!(err.is_fatal());
    }
}

//! HMI node driver.

use latchkey_core::{
    Environment, SessionState,
    hal::{Display, Keypad, KeypadError},
    link::{Link, LinkError},
    timer::{IntervalTimer, TimerHardware},
};

use crate::{
    engine::{HmiAction, HmiAwait, HmiConfig, HmiEngine, HmiEvent},
    entry::{collect_passcode, select_command},
    error::HmiError,
    screen::Screen,
};

/// User-facing peripherals owned by the HMI node.
pub struct HmiPeripherals {
    /// Key input.
    pub keypad: Box<dyn Keypad>,
    /// Two-line display.
    pub display: Box<dyn Display>,
}

impl std::fmt::Debug for HmiPeripherals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmiPeripherals").finish_non_exhaustive()
    }
}

/// One running HMI node.
pub struct HmiNode<E, L, H> {
    env: E,
    config: HmiConfig,
    engine: HmiEngine,
    link: L,
    timer: IntervalTimer<H>,
    peripherals: HmiPeripherals,
}

impl<E, L, H> HmiNode<E, L, H>
where
    E: Environment,
    L: Link,
    H: TimerHardware,
{
    /// Assemble a node.
    ///
    /// # Errors
    ///
    /// Fails if the timer configuration cannot express the configured dwells.
    pub fn new(
        env: E,
        link: L,
        hardware: H,
        peripherals: HmiPeripherals,
        config: HmiConfig,
    ) -> Result<Self, HmiError> {
        let timer = IntervalTimer::new(config.timer, hardware)?;
        timer.ticks_for(config.timing.door_dwell)?;
        timer.ticks_for(config.timing.lockout_dwell)?;

        Ok(Self { env, config, engine: HmiEngine::new(config.timing), link, timer, peripherals })
    }

    /// Current session state.
    pub const fn state(&self) -> SessionState {
        self.engine.state()
    }

    /// Protocol engine.
    pub const fn engine(&self) -> &HmiEngine {
        &self.engine
    }

    /// Show the banner, then the first prompt.
    pub async fn power_on(&mut self) {
        self.peripherals.display.show(&Screen::Banner.text());
        self.env.sleep(self.config.banner).await;
        let actions = self.engine.start();
        // Only screens at power-on; no link traffic to fail.
        for action in actions {
            if let HmiAction::Show(screen) = action {
                self.peripherals.display.show(&screen.text());
            }
        }
    }

    /// Wait for the next input, feed it to the engine, execute the result.
    ///
    /// # Errors
    ///
    /// Any [`HmiError`]; see [`HmiError::is_fatal`].
    pub async fn step(&mut self) -> Result<(), HmiError> {
        let event = match self.engine.awaiting() {
            HmiAwait::Passcode => {
                let HmiPeripherals { keypad, display } = &mut self.peripherals;
                HmiEvent::PasscodeEntered(collect_passcode(keypad.as_mut(), display.as_mut()).await?)
            },
            HmiAwait::Menu => {
                HmiEvent::MenuSelected(select_command(self.peripherals.keypad.as_mut()).await?)
            },
            HmiAwait::Link => HmiEvent::Byte(self.link.recv_byte().await?),
            HmiAwait::Dwell(duration) => {
                self.timer.dwell(duration).await?;
                HmiEvent::DwellElapsed
            },
        };

        let actions = self.engine.handle(event)?;
        self.execute(actions).await
    }

    /// Power on, then run until Control hangs up, the keypad closes, or a
    /// fatal error occurs.
    ///
    /// # Errors
    ///
    /// Every error except the two clean shutdowns.
    pub async fn run(&mut self) -> Result<(), HmiError> {
        self.power_on().await;
        tracing::info!(state = %self.engine.state(), "hmi node running");

        loop {
            match self.step().await {
                Ok(()) => {},
                Err(HmiError::Link(LinkError::Closed)) => {
                    tracing::info!(state = %self.engine.state(), "control disconnected");
                    return Ok(());
                },
                Err(HmiError::Keypad(KeypadError::Closed)) => {
                    tracing::info!(state = %self.engine.state(), "keypad closed");
                    return Ok(());
                },
                Err(err) => {
                    tracing::error!(state = %self.engine.state(), %err, "hmi node halted");
                    return Err(err);
                },
            }
        }
    }

    async fn execute(&mut self, actions: Vec<HmiAction>) -> Result<(), HmiError> {
        for action in actions {
            match action {
                HmiAction::Send(bytes) => self.link.send_all(&bytes).await?,
                HmiAction::Show(screen) => self.peripherals.display.show(&screen.text()),
            }
        }
        Ok(())
    }
}

impl<E, L, H> std::fmt::Debug for HmiNode<E, L, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmiNode")
            .field("engine", &self.engine)
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use latchkey_core::{ProtocolTiming, SystemEnv, link::StreamLink, timer::TokioTimer};
    use latchkey_proto::{Outcome, encode_outcome};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;
    use crate::devices::{ReaderKeypad, TextDisplay};

    fn config() -> HmiConfig {
        HmiConfig {
            timing: ProtocolTiming {
                door_dwell: Duration::from_secs(1),
                lockout_dwell: Duration::from_secs(3),
            },
            ..HmiConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn enrollment_over_stream_link() {
        let (hmi, mut control) = tokio::io::duplex(64);
        let peripherals = HmiPeripherals {
            keypad: Box::new(ReaderKeypad::new(&b"13579\n13579\n"[..])),
            display: Box::new(TextDisplay::new(std::io::sink())),
        };
        let mut node =
            HmiNode::new(SystemEnv, StreamLink::new(hmi), TokioTimer::new(), peripherals, config())
                .unwrap();

        let control_side = tokio::spawn(async move {
            let mut candidates = [0u8; 12];
            control.read_exact(&mut candidates).await.unwrap();
            control.write_all(&encode_outcome(Outcome::Proceed)).await.unwrap();
            candidates
        });

        node.power_on().await;
        while node.state() == SessionState::AwaitingEnrollment {
            node.step().await.unwrap();
        }

        assert_eq!(node.state(), SessionState::Idle);
        assert_eq!(control_side.await.unwrap(), [1, 1, 3, 5, 7, 9, 1, 1, 3, 5, 7, 9]);
    }

    #[tokio::test(start_paused = true)]
    async fn keypad_end_stops_cleanly() {
        let (hmi, _control) = tokio::io::duplex(64);
        let peripherals = HmiPeripherals {
            keypad: Box::new(ReaderKeypad::new(&b"12"[..])),
            display: Box::new(TextDisplay::new(std::io::sink())),
        };
        let mut node =
            HmiNode::new(SystemEnv, StreamLink::new(hmi), TokioTimer::new(), peripherals, config())
                .unwrap();

        node.run().await.unwrap();
        assert_eq!(node.state(), SessionState::AwaitingEnrollment);
    }
}

//! Control-side protocol engine.
//!
//! The authority of the pair: compares candidates against the stored
//! credential, decides outcomes, and sequences the door and the alarm.
//! Pure state machine. Feed it [`ControlEvent`]s, execute the returned
//! [`ControlAction`]s, and block on whatever [`ControlEngine::awaiting`] says.

use std::time::Duration;

use bytes::Bytes;
use latchkey_core::{
    AttemptCounter, ProtocolError, ProtocolTiming, SessionState, Transition,
    hal::{CredentialStore, Direction},
    timer::TimerConfig,
    wait::WaitPolicy,
};
use latchkey_proto::{
    Command, FrameAssembler, Outcome, Passcode, encode_outcome, encode_people_clear,
};

use crate::error::ControlError;

/// Control node configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlConfig {
    /// Door and lockout dwells.
    pub timing: ProtocolTiming,
    /// Motor drive strength while opening and closing.
    pub motor_power: u8,
    /// Presence polling while the door is held open.
    pub presence_wait: WaitPolicy,
    /// Timer used for the dwells.
    pub timer: TimerConfig,
    /// Skip first-run enrollment when the store already holds a valid
    /// credential.
    pub resume_enrolled: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            timing: ProtocolTiming::default(),
            motor_power: u8::MAX,
            presence_wait: WaitPolicy::default(),
            timer: TimerConfig::default(),
            resume_enrolled: false,
        }
    }
}

/// Inputs to the Control engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// One byte arrived from the HMI.
    Byte(u8),
    /// The dwell requested by [`ControlAwait::Dwell`] expired.
    DwellElapsed,
    /// The presence sensor reports the doorway empty.
    PresenceCleared,
}

/// Side effects requested by the Control engine, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlAction {
    /// Write bytes to the link.
    Send(Bytes),
    /// Drive the door motor.
    Drive {
        /// Direction.
        direction: Direction,
        /// Strength (0-255).
        power: u8,
    },
    /// Start the lockout alarm.
    AlarmOn,
    /// Stop the lockout alarm.
    AlarmOff,
}

/// What the driver must wait for before the next event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAwait {
    /// Next link byte.
    Link,
    /// Dwell of this length, then [`ControlEvent::DwellElapsed`].
    Dwell(Duration),
    /// Doorway empty, then [`ControlEvent::PresenceCleared`].
    PresenceClear,
}

/// Why an enrollment is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentScope {
    /// First run, nothing enrolled yet.
    Initial,
    /// Replacing the credential after a verified change request.
    Change,
}

/// Sub-phase of the door cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorPhase {
    /// Motor driving open for the door dwell.
    Opening,
    /// Motor stopped, waiting for the doorway to clear.
    AwaitingClear,
    /// Motor driving closed for the door dwell.
    Closing,
}

/// Control-side protocol engine.
///
/// # Invariants
///
/// - The store is written only after two enrollment candidates matched, and
///   then all five digits are written.
/// - At most [`latchkey_core::MAX_ATTEMPTS`] outcomes per verification cycle;
///   the last `Retry` is sent before entering Lockout.
/// - The link is not consumed during the door cycle or lockout.
pub struct ControlEngine<S> {
    store: S,
    config: ControlConfig,
    state: SessionState,
    scope: EnrollmentScope,
    first_entry: Option<Passcode>,
    attempts: AttemptCounter,
    door: DoorPhase,
    frame: FrameAssembler,
}

impl<S: CredentialStore> ControlEngine<S> {
    /// Build the engine around `store`.
    ///
    /// Starts in AwaitingEnrollment unless `resume_enrolled` is set and the
    /// store already holds a valid credential.
    pub fn new(mut store: S, config: ControlConfig) -> Self {
        let state = if config.resume_enrolled && store.load().is_ok() {
            tracing::info!("stored credential found, resuming enrolled");
            SessionState::Idle
        } else {
            SessionState::AwaitingEnrollment
        };

        Self {
            store,
            config,
            state,
            scope: EnrollmentScope::Initial,
            first_entry: None,
            attempts: AttemptCounter::new(),
            door: DoorPhase::Opening,
            frame: FrameAssembler::candidate(),
        }
    }

    /// Current session state.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Door sub-phase; meaningful only in DoorCycle.
    pub const fn door_phase(&self) -> DoorPhase {
        self.door
    }

    /// Scope of the current or last enrollment.
    pub const fn enrollment_scope(&self) -> EnrollmentScope {
        self.scope
    }

    /// Failed rounds in the current verification cycle.
    pub const fn attempts(&self) -> AttemptCounter {
        self.attempts
    }

    /// Configuration.
    pub const fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// Credential store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Consume the engine, returning the store.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Input the driver must block on next.
    pub const fn awaiting(&self) -> ControlAwait {
        match self.state {
            SessionState::DoorCycle => match self.door {
                DoorPhase::Opening | DoorPhase::Closing => {
                    ControlAwait::Dwell(self.config.timing.door_dwell)
                },
                DoorPhase::AwaitingClear => ControlAwait::PresenceClear,
            },
            SessionState::Lockout => ControlAwait::Dwell(self.config.timing.lockout_dwell),
            SessionState::AwaitingEnrollment
            | SessionState::Idle
            | SessionState::AwaitingDoorVerification
            | SessionState::AwaitingChangeVerification => ControlAwait::Link,
        }
    }

    /// Process one event.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::UnexpectedByte`] when a link byte does not fit the
    ///   current step. The link is desynchronized and the node should halt.
    /// - [`ProtocolError::UnexpectedEvent`] when the event is not the one
    ///   [`Self::awaiting`] asked for.
    /// - Store failures while reading or writing the credential.
    pub fn handle(&mut self, event: ControlEvent) -> Result<Vec<ControlAction>, ControlError> {
        match (self.awaiting(), event) {
            (ControlAwait::Link, ControlEvent::Byte(byte)) => self.handle_byte(byte),
            (ControlAwait::Dwell(_), ControlEvent::DwellElapsed) => self.handle_dwell_elapsed(),
            (ControlAwait::PresenceClear, ControlEvent::PresenceCleared) => {
                Ok(self.handle_presence_cleared())
            },
            (_, event) => Err(ProtocolError::UnexpectedEvent {
                state: self.state,
                event: event_name(event),
            }
            .into()),
        }
    }

    fn handle_byte(&mut self, byte: u8) -> Result<Vec<ControlAction>, ControlError> {
        if self.state == SessionState::Idle {
            let command = Command::from_byte(byte).map_err(|source| self.desync(byte, source))?;
            return self.handle_command(command);
        }

        let payload = match self.frame.push(byte) {
            Ok(Some(payload)) => payload,
            Ok(None) => return Ok(Vec::new()),
            Err(source) => return Err(self.desync(byte, source)),
        };
        let candidate = Passcode::from_slice(&payload).map_err(|source| self.desync(byte, source))?;

        if self.state == SessionState::AwaitingEnrollment {
            self.handle_enrollment_entry(candidate)
        } else {
            self.handle_verification_round(candidate)
        }
    }

    fn handle_command(&mut self, command: Command) -> Result<Vec<ControlAction>, ControlError> {
        self.transition(Transition::CommandSelected(command))?;
        self.attempts.reset();
        self.frame.reset();
        Ok(Vec::new())
    }

    fn handle_enrollment_entry(
        &mut self,
        candidate: Passcode,
    ) -> Result<Vec<ControlAction>, ControlError> {
        let Some(first) = self.first_entry.take() else {
            self.first_entry = Some(candidate);
            return Ok(Vec::new());
        };

        let outcome = Outcome::from_match(first.matches(&candidate));
        match outcome {
            Outcome::Proceed => {
                self.store.store(&candidate)?;
                tracing::info!(scope = ?self.scope, "credential enrolled");
                self.transition(Transition::EnrollmentMatched)?;
            },
            Outcome::Retry => {
                tracing::info!(scope = ?self.scope, "enrollment entries differ");
                self.transition(Transition::EnrollmentMismatched)?;
            },
        }

        Ok(vec![ControlAction::Send(encode_outcome(outcome))])
    }

    fn handle_verification_round(
        &mut self,
        candidate: Passcode,
    ) -> Result<Vec<ControlAction>, ControlError> {
        let stored = self.store.load()?;

        if let Some(position) = stored.first_mismatch(&candidate) {
            let transition = self.attempts.record_failure();
            tracing::info!(position, remaining = self.attempts.remaining(), "verification failed");
            self.transition(transition)?;

            let mut actions = vec![ControlAction::Send(encode_outcome(Outcome::Retry))];
            if self.state == SessionState::Lockout {
                tracing::warn!("attempts exhausted, locking out");
                actions.push(ControlAction::AlarmOn);
            }
            return Ok(actions);
        }

        self.attempts.reset();
        self.transition(Transition::RoundMatched)?;

        let mut actions = vec![ControlAction::Send(encode_outcome(Outcome::Proceed))];
        match self.state {
            SessionState::DoorCycle => {
                self.door = DoorPhase::Opening;
                actions.push(self.drive(Direction::Open));
            },
            SessionState::AwaitingEnrollment => {
                self.scope = EnrollmentScope::Change;
                self.first_entry = None;
            },
            _ => {},
        }
        Ok(actions)
    }

    fn handle_dwell_elapsed(&mut self) -> Result<Vec<ControlAction>, ControlError> {
        if self.state == SessionState::Lockout {
            self.transition(Transition::LockoutElapsed)?;
            return Ok(vec![ControlAction::AlarmOff]);
        }

        match self.door {
            DoorPhase::Opening => {
                self.door = DoorPhase::AwaitingClear;
                Ok(vec![self.stop()])
            },
            DoorPhase::Closing => {
                self.door = DoorPhase::Opening;
                self.transition(Transition::DoorCycleComplete)?;
                Ok(vec![self.stop()])
            },
            DoorPhase::AwaitingClear => Err(ProtocolError::UnexpectedEvent {
                state: self.state,
                event: event_name(ControlEvent::DwellElapsed),
            }
            .into()),
        }
    }

    fn handle_presence_cleared(&mut self) -> Vec<ControlAction> {
        self.door = DoorPhase::Closing;
        tracing::debug!("doorway clear, closing");
        vec![ControlAction::Send(encode_people_clear()), self.drive(Direction::Close)]
    }

    fn transition(&mut self, transition: Transition) -> Result<(), ProtocolError> {
        let from = self.state;
        let to = self.state.advance(transition)?;
        if from != to {
            tracing::info!(%from, %to, "control state");
        }
        Ok(())
    }

    fn desync(&mut self, byte: u8, source: latchkey_proto::ProtoError) -> ControlError {
        self.frame.reset();
        tracing::error!(state = %self.state, byte, %source, "link desynchronized");
        ProtocolError::unexpected_byte(self.state, byte, source).into()
    }

    const fn drive(&self, direction: Direction) -> ControlAction {
        ControlAction::Drive { direction, power: self.config.motor_power }
    }

    const fn stop(&self) -> ControlAction {
        ControlAction::Drive { direction: Direction::Stop, power: 0 }
    }
}

const fn event_name(event: ControlEvent) -> &'static str {
    match event {
        ControlEvent::Byte(_) => "link byte",
        ControlEvent::DwellElapsed => "dwell expiry",
        ControlEvent::PresenceCleared => "presence clear",
    }
}

impl<S> std::fmt::Debug for ControlEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlEngine")
            .field("state", &self.state)
            .field("scope", &self.scope)
            .field("attempts", &self.attempts)
            .field("door", &self.door)
            .finish_non_exhaustive()
    }
}

//! HMI-side protocol engine.
//!
//! Mirrors the Control engine from the user's side: collects entries, relays
//! them, and follows the outcomes Control reports. It keeps its own attempt
//! counter so both nodes enter Lockout on the same round without a lockout
//! message on the link.

use std::time::Duration;

use bytes::Bytes;
use latchkey_core::{
    AttemptCounter, ProtocolError, ProtocolTiming, SessionState, Transition,
    timer::TimerConfig,
};
use latchkey_proto::{
    Command, FrameAssembler, LinkCode, Outcome, Passcode, ProtoError, encode_candidate,
};

use crate::{error::HmiError, screen::Screen};

/// HMI node configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HmiConfig {
    /// Door and lockout dwells; must match the Control node.
    pub timing: ProtocolTiming,
    /// Timer used for the dwells.
    pub timer: TimerConfig,
    /// How long the banner stays up at power-on.
    pub banner: Duration,
}

impl Default for HmiConfig {
    fn default() -> Self {
        Self {
            timing: ProtocolTiming::default(),
            timer: TimerConfig::default(),
            banner: Duration::from_secs(2),
        }
    }
}

/// Inputs to the HMI engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmiEvent {
    /// User typed five digits and confirmed.
    PasscodeEntered(Passcode),
    /// User picked a menu entry.
    MenuSelected(Command),
    /// One byte arrived from Control.
    Byte(u8),
    /// The dwell requested by [`HmiAwait::Dwell`] expired.
    DwellElapsed,
}

/// Side effects requested by the HMI engine, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HmiAction {
    /// Write bytes to the link.
    Send(Bytes),
    /// Replace the display contents.
    Show(Screen),
}

/// What the driver must wait for before the next event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmiAwait {
    /// A full passcode entry from the keypad.
    Passcode,
    /// A menu key from the keypad.
    Menu,
    /// Next link byte.
    Link,
    /// Dwell of this length, then [`HmiEvent::DwellElapsed`].
    Dwell(Duration),
}

/// Progress through one enrollment round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentStep {
    /// Waiting for the first entry.
    First,
    /// Waiting for the confirming entry.
    Confirm,
    /// Both sent; waiting for Control's outcome.
    AwaitingOutcome,
}

/// Progress through one verification round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStep {
    /// Waiting for the candidate entry.
    Entering,
    /// Candidate sent; waiting for Control's outcome.
    AwaitingOutcome,
}

/// Sub-phase of the door cycle as the user sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorStage {
    /// "Door Opening" for the door dwell.
    Opening,
    /// "Wait for people" until Control reports the doorway clear.
    AwaitingPeopleClear,
    /// "Door Closing" for the door dwell.
    Closing,
}

/// HMI-side protocol engine.
#[derive(Debug)]
pub struct HmiEngine {
    timing: ProtocolTiming,
    state: SessionState,
    enrollment: EnrollmentStep,
    verification: VerificationStep,
    door: DoorStage,
    attempts: AttemptCounter,
    frame: FrameAssembler,
}

impl HmiEngine {
    /// Engine at power-on: nothing enrolled.
    pub fn new(timing: ProtocolTiming) -> Self {
        Self {
            timing,
            state: SessionState::AwaitingEnrollment,
            enrollment: EnrollmentStep::First,
            verification: VerificationStep::Entering,
            door: DoorStage::Opening,
            attempts: AttemptCounter::new(),
            frame: FrameAssembler::signal(),
        }
    }

    /// Current session state.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Failed rounds in the current verification cycle.
    pub const fn attempts(&self) -> AttemptCounter {
        self.attempts
    }

    /// Door sub-phase; meaningful only in DoorCycle.
    pub const fn door_stage(&self) -> DoorStage {
        self.door
    }

    /// First prompt after the banner.
    pub fn start(&self) -> Vec<HmiAction> {
        vec![HmiAction::Show(self.prompt())]
    }

    /// Input the driver must block on next.
    pub const fn awaiting(&self) -> HmiAwait {
        match self.state {
            SessionState::AwaitingEnrollment => match self.enrollment {
                EnrollmentStep::First | EnrollmentStep::Confirm => HmiAwait::Passcode,
                EnrollmentStep::AwaitingOutcome => HmiAwait::Link,
            },
            SessionState::Idle => HmiAwait::Menu,
            SessionState::AwaitingDoorVerification | SessionState::AwaitingChangeVerification => {
                match self.verification {
                    VerificationStep::Entering => HmiAwait::Passcode,
                    VerificationStep::AwaitingOutcome => HmiAwait::Link,
                }
            },
            SessionState::DoorCycle => match self.door {
                DoorStage::Opening | DoorStage::Closing => HmiAwait::Dwell(self.timing.door_dwell),
                DoorStage::AwaitingPeopleClear => HmiAwait::Link,
            },
            SessionState::Lockout => HmiAwait::Dwell(self.timing.lockout_dwell),
        }
    }

    /// Process one event.
    ///
    /// # Errors
    ///
    /// - [`ProtocolError::UnexpectedByte`] when Control sends something the
    ///   current step does not accept.
    /// - [`ProtocolError::UnexpectedEvent`] when the event is not the one
    ///   [`Self::awaiting`] asked for.
    pub fn handle(&mut self, event: HmiEvent) -> Result<Vec<HmiAction>, HmiError> {
        match (self.awaiting(), event) {
            (HmiAwait::Passcode, HmiEvent::PasscodeEntered(passcode)) => {
                Ok(self.handle_passcode(&passcode))
            },
            (HmiAwait::Menu, HmiEvent::MenuSelected(command)) => self.handle_menu(command),
            (HmiAwait::Link, HmiEvent::Byte(byte)) => self.handle_byte(byte),
            (HmiAwait::Dwell(_), HmiEvent::DwellElapsed) => self.handle_dwell_elapsed(),
            (_, event) => Err(ProtocolError::UnexpectedEvent {
                state: self.state,
                event: event_name(event),
            }
            .into()),
        }
    }

    fn handle_passcode(&mut self, passcode: &Passcode) -> Vec<HmiAction> {
        let mut actions = vec![HmiAction::Send(encode_candidate(passcode))];

        if self.state == SessionState::AwaitingEnrollment {
            if self.enrollment == EnrollmentStep::First {
                self.enrollment = EnrollmentStep::Confirm;
                actions.push(HmiAction::Show(Screen::ReEnterPass));
            } else {
                self.enrollment = EnrollmentStep::AwaitingOutcome;
            }
        } else {
            self.verification = VerificationStep::AwaitingOutcome;
        }
        actions
    }

    fn handle_menu(&mut self, command: Command) -> Result<Vec<HmiAction>, HmiError> {
        self.transition(Transition::CommandSelected(command))?;
        self.attempts.reset();
        self.verification = VerificationStep::Entering;
        Ok(vec![
            HmiAction::Send(Bytes::copy_from_slice(&[command.code().to_u8()])),
            HmiAction::Show(Screen::EnterOldPass),
        ])
    }

    fn handle_byte(&mut self, byte: u8) -> Result<Vec<HmiAction>, HmiError> {
        let payload = match self.frame.push(byte) {
            Ok(Some(payload)) => payload,
            Ok(None) => return Ok(Vec::new()),
            Err(source) => return Err(self.desync(byte, source)),
        };
        let code = payload.first().copied().unwrap_or(byte);

        if self.state == SessionState::DoorCycle {
            return self.handle_people_clear(code);
        }

        let outcome = Outcome::from_byte(code).map_err(|source| self.desync(code, source))?;
        if self.state == SessionState::AwaitingEnrollment {
            self.handle_enrollment_outcome(outcome)
        } else {
            self.handle_verification_outcome(outcome)
        }
    }

    fn handle_enrollment_outcome(&mut self, outcome: Outcome) -> Result<Vec<HmiAction>, HmiError> {
        self.enrollment = EnrollmentStep::First;
        match outcome {
            Outcome::Proceed => self.transition(Transition::EnrollmentMatched)?,
            Outcome::Retry => self.transition(Transition::EnrollmentMismatched)?,
        }
        Ok(vec![HmiAction::Show(self.prompt())])
    }

    fn handle_verification_outcome(
        &mut self,
        outcome: Outcome,
    ) -> Result<Vec<HmiAction>, HmiError> {
        self.verification = VerificationStep::Entering;

        let transition = match outcome {
            Outcome::Proceed => {
                self.attempts.reset();
                Transition::RoundMatched
            },
            Outcome::Retry => self.attempts.record_failure(),
        };
        self.transition(transition)?;

        match self.state {
            SessionState::DoorCycle => self.door = DoorStage::Opening,
            SessionState::AwaitingEnrollment => self.enrollment = EnrollmentStep::First,
            SessionState::Lockout => tracing::warn!("attempts exhausted, system locked"),
            _ => {},
        }
        Ok(vec![HmiAction::Show(self.prompt())])
    }

    fn handle_people_clear(&mut self, code: u8) -> Result<Vec<HmiAction>, HmiError> {
        match LinkCode::try_from(code) {
            Ok(LinkCode::NoPeople) => {
                self.door = DoorStage::Closing;
                Ok(vec![HmiAction::Show(self.prompt())])
            },
            Ok(other) => Err(self.desync(
                code,
                ProtoError::UnexpectedCode { code: other, expected: "people clear" },
            )),
            Err(source) => Err(self.desync(code, source)),
        }
    }

    fn handle_dwell_elapsed(&mut self) -> Result<Vec<HmiAction>, HmiError> {
        match (self.state, self.door) {
            (SessionState::Lockout, _) => self.transition(Transition::LockoutElapsed)?,
            (SessionState::DoorCycle, DoorStage::Opening) => {
                self.door = DoorStage::AwaitingPeopleClear;
            },
            (SessionState::DoorCycle, DoorStage::Closing) => {
                self.door = DoorStage::Opening;
                self.transition(Transition::DoorCycleComplete)?;
            },
            _ => {
                return Err(ProtocolError::UnexpectedEvent {
                    state: self.state,
                    event: event_name(HmiEvent::DwellElapsed),
                }
                .into());
            },
        }
        Ok(vec![HmiAction::Show(self.prompt())])
    }

    /// Screen for the current step.
    pub const fn prompt(&self) -> Screen {
        match self.state {
            SessionState::AwaitingEnrollment => match self.enrollment {
                EnrollmentStep::Confirm => Screen::ReEnterPass,
                EnrollmentStep::First | EnrollmentStep::AwaitingOutcome => Screen::EnterPass,
            },
            SessionState::Idle => Screen::Menu,
            SessionState::AwaitingDoorVerification | SessionState::AwaitingChangeVerification => {
                Screen::EnterOldPass
            },
            SessionState::DoorCycle => match self.door {
                DoorStage::Opening => Screen::DoorOpening,
                DoorStage::AwaitingPeopleClear => Screen::WaitForPeople,
                DoorStage::Closing => Screen::DoorClosing,
            },
            SessionState::Lockout => Screen::Locked { wait: self.timing.lockout_dwell },
        }
    }

    fn transition(&mut self, transition: Transition) -> Result<(), ProtocolError> {
        let from = self.state;
        let to = self.state.advance(transition)?;
        if from != to {
            tracing::info!(%from, %to, "hmi state");
        }
        Ok(())
    }

    fn desync(&mut self, byte: u8, source: ProtoError) -> HmiError {
        self.frame.reset();
        tracing::error!(state = %self.state, byte, %source, "link desynchronized");
        ProtocolError::unexpected_byte(self.state, byte, source).into()
    }
}

const fn event_name(event: HmiEvent) -> &'static str {
    match event {
        HmiEvent::PasscodeEntered(_) => "passcode entry",
        HmiEvent::MenuSelected(_) => "menu selection",
        HmiEvent::Byte(_) => "link byte",
        HmiEvent::DwellElapsed => "dwell expiry",
    }
}

//! In-process pair runner.
//!
//! Drives a [`ControlEngine`] and an [`HmiEngine`] against each other without
//! any I/O: bytes one engine sends are queued for the other, dwells elapse
//! immediately and the doorway is always clear. Useful for exploring long
//! random user scripts far faster than a full simulation.

use std::collections::VecDeque;

use latchkey_control::{ControlAction, ControlAwait, ControlConfig, ControlEngine, ControlEvent};
use latchkey_core::{
    SessionState,
    hal::{Direction, MemoryCredentialStore},
};
use latchkey_hmi::{HmiAction, HmiAwait, HmiEngine, HmiEvent, Screen};
use latchkey_proto::{Command, Passcode};

/// Failure while running the pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockstepError {
    /// The Control engine rejected an event.
    Control(String),
    /// The HMI engine rejected an event.
    Hmi(String),
    /// Both engines are blocked on each other.
    Stalled {
        /// Control state when stalled.
        control: SessionState,
        /// HMI state when stalled.
        hmi: SessionState,
    },
}

impl std::fmt::Display for LockstepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Control(err) => write!(f, "control engine: {err}"),
            Self::Hmi(err) => write!(f, "hmi engine: {err}"),
            Self::Stalled { control, hmi } => {
                write!(f, "pair stalled with control {control} and hmi {hmi}")
            },
        }
    }
}

impl std::error::Error for LockstepError {}

/// User input the HMI was not waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotAccepted(pub HmiAwait);

/// Control and HMI engines wired back to back.
#[derive(Debug)]
pub struct Lockstep {
    control: ControlEngine<MemoryCredentialStore>,
    hmi: HmiEngine,
    to_control: VecDeque<u8>,
    to_hmi: VecDeque<u8>,
    screens: Vec<Screen>,
    door_cycles: usize,
    lockouts: usize,
}

impl Lockstep {
    /// Fresh pair with a blank store.
    pub fn new(config: ControlConfig) -> Self {
        let hmi = HmiEngine::new(config.timing);
        let screens = hmi.start().into_iter().filter_map(screen_of).collect();
        Self {
            control: ControlEngine::new(MemoryCredentialStore::blank(), config),
            hmi,
            to_control: VecDeque::new(),
            to_hmi: VecDeque::new(),
            screens,
            door_cycles: 0,
            lockouts: 0,
        }
    }

    /// Control engine.
    pub fn control(&self) -> &ControlEngine<MemoryCredentialStore> {
        &self.control
    }

    /// HMI engine.
    pub fn hmi(&self) -> &HmiEngine {
        &self.hmi
    }

    /// Screens shown so far.
    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    /// Completed door openings.
    pub fn door_cycles(&self) -> usize {
        self.door_cycles
    }

    /// Lockouts entered.
    pub fn lockouts(&self) -> usize {
        self.lockouts
    }

    /// User input the HMI is waiting for, or `None` while the pair is busy.
    pub fn expects(&self) -> Option<HmiAwait> {
        match self.hmi.awaiting() {
            awaiting @ (HmiAwait::Passcode | HmiAwait::Menu) => Some(awaiting),
            HmiAwait::Link | HmiAwait::Dwell(_) => None,
        }
    }

    /// Type a passcode and run the pair until it needs the user again.
    pub fn enter(&mut self, passcode: Passcode) -> Result<Result<(), NotAccepted>, LockstepError> {
        self.user(HmiAwait::Passcode, HmiEvent::PasscodeEntered(passcode))
    }

    /// Pick a menu command and run the pair until it needs the user again.
    pub fn select(&mut self, command: Command) -> Result<Result<(), NotAccepted>, LockstepError> {
        self.user(HmiAwait::Menu, HmiEvent::MenuSelected(command))
    }

    fn user(
        &mut self,
        wanted: HmiAwait,
        event: HmiEvent,
    ) -> Result<Result<(), NotAccepted>, LockstepError> {
        let awaiting = self.hmi.awaiting();
        if awaiting != wanted {
            return Ok(Err(NotAccepted(awaiting)));
        }
        self.feed_hmi(event)?;
        self.settle()?;
        Ok(Ok(()))
    }

    /// Exchange bytes and elapse dwells until the HMI waits on the user
    /// and the link is quiet.
    pub fn settle(&mut self) -> Result<(), LockstepError> {
        loop {
            let progressed = self.step_control()? | self.step_hmi()?;
            if progressed {
                continue;
            }
            if self.expects().is_some() && self.to_control.is_empty() && self.to_hmi.is_empty() {
                return Ok(());
            }
            return Err(LockstepError::Stalled {
                control: self.control.state(),
                hmi: self.hmi.state(),
            });
        }
    }

    fn step_control(&mut self) -> Result<bool, LockstepError> {
        let event = match self.control.awaiting() {
            ControlAwait::Link => match self.to_control.pop_front() {
                Some(byte) => ControlEvent::Byte(byte),
                None => return Ok(false),
            },
            ControlAwait::Dwell(_) => ControlEvent::DwellElapsed,
            ControlAwait::PresenceClear => ControlEvent::PresenceCleared,
        };

        let actions =
            self.control.handle(event).map_err(|err| LockstepError::Control(err.to_string()))?;
        for action in actions {
            match action {
                ControlAction::Send(bytes) => self.to_hmi.extend(bytes.iter().copied()),
                ControlAction::AlarmOn => self.lockouts += 1,
                ControlAction::Drive { direction: Direction::Open, .. } => self.door_cycles += 1,
                ControlAction::Drive { .. } | ControlAction::AlarmOff => {},
            }
        }
        Ok(true)
    }

    fn step_hmi(&mut self) -> Result<bool, LockstepError> {
        let event = match self.hmi.awaiting() {
            HmiAwait::Link => match self.to_hmi.pop_front() {
                Some(byte) => HmiEvent::Byte(byte),
                None => return Ok(false),
            },
            HmiAwait::Dwell(_) => HmiEvent::DwellElapsed,
            HmiAwait::Passcode | HmiAwait::Menu => return Ok(false),
        };
        self.feed_hmi(event)?;
        Ok(true)
    }

    fn feed_hmi(&mut self, event: HmiEvent) -> Result<(), LockstepError> {
        let actions = self.hmi.handle(event).map_err(|err| LockstepError::Hmi(err.to_string()))?;
        for action in actions {
            match action {
                HmiAction::Send(bytes) => self.to_control.extend(bytes.iter().copied()),
                HmiAction::Show(screen) => self.screens.push(screen),
            }
        }
        Ok(())
    }
}

fn screen_of(action: HmiAction) -> Option<Screen> {
    match action {
        HmiAction::Show(screen) => Some(screen),
        HmiAction::Send(_) => None,
    }
}

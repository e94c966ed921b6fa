//! Reference model world.

use latchkey_core::SessionState;
use latchkey_proto::PASSCODE_LEN;

use super::operation::{ModelCommand, ModelPasscode, Operation, OperationError, OperationResult};

type Digits = [u8; PASSCODE_LEN];

/// Where the model is waiting for the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Enrolling { first: Option<Digits> },
    Menu,
    Verifying { command: ModelCommand, failures: u8 },
}

/// State compared between the model and the real pair after every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObservableState {
    /// Session state both nodes rest in.
    pub state: SessionState,
    /// Stored credential; `None` before the first enrollment.
    pub credential: Option<Digits>,
    /// Door openings so far.
    pub door_cycles: usize,
    /// Lockouts so far.
    pub lockouts: usize,
}

/// Reference model of the paired nodes.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    phase: Phase,
    credential: Option<Digits>,
    door_cycles: usize,
    lockouts: usize,
}

impl Default for ModelWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelWorld {
    /// Fresh system awaiting its first enrollment.
    pub fn new() -> Self {
        Self {
            phase: Phase::Enrolling { first: None },
            credential: None,
            door_cycles: 0,
            lockouts: 0,
        }
    }

    /// Apply one user operation.
    pub fn apply(&mut self, op: Operation) -> OperationResult {
        match (self.phase, op) {
            (Phase::Enrolling { first: None }, Operation::Enter(code)) => {
                self.phase = Phase::Enrolling { first: Some(code.digits()) };
            },
            (Phase::Enrolling { first: Some(first) }, Operation::Enter(code)) => {
                if first == code.digits() {
                    self.credential = Some(first);
                    self.phase = Phase::Menu;
                } else {
                    self.phase = Phase::Enrolling { first: None };
                }
            },
            (Phase::Menu, Operation::Select(command)) => {
                self.phase = Phase::Verifying { command, failures: 0 };
            },
            (Phase::Verifying { command, failures }, Operation::Enter(code)) => {
                self.verify(command, failures, code);
            },
            (Phase::Enrolling { .. } | Phase::Verifying { .. }, Operation::Select(_))
            | (Phase::Menu, Operation::Enter(_)) => return Err(OperationError::NotExpected),
        }
        Ok(())
    }

    fn verify(&mut self, command: ModelCommand, failures: u8, code: ModelPasscode) {
        if self.credential == Some(code.digits()) {
            self.phase = match command {
                ModelCommand::OpenDoor => {
                    self.door_cycles += 1;
                    Phase::Menu
                },
                ModelCommand::ChangePassword => Phase::Enrolling { first: None },
            };
        } else if failures + 1 >= 3 {
            self.lockouts += 1;
            self.phase = Phase::Menu;
        } else {
            self.phase = Phase::Verifying { command, failures: failures + 1 };
        }
    }

    /// State to compare against the real pair.
    pub fn observable_state(&self) -> ObservableState {
        let state = match self.phase {
            Phase::Enrolling { .. } => SessionState::AwaitingEnrollment,
            Phase::Menu => SessionState::Idle,
            Phase::Verifying { command: ModelCommand::OpenDoor, .. } => {
                SessionState::AwaitingDoorVerification
            },
            Phase::Verifying { command: ModelCommand::ChangePassword, .. } => {
                SessionState::AwaitingChangeVerification
            },
        };
        ObservableState {
            state,
            credential: self.credential,
            door_cycles: self.door_cycles,
            lockouts: self.lockouts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RIGHT: ModelPasscode = ModelPasscode(0);
    const WRONG: ModelPasscode = ModelPasscode(3);

    #[test]
    fn enrollment_needs_two_equal_entries() {
        let mut world = ModelWorld::new();
        assert_eq!(world.apply(Operation::Enter(RIGHT)), Ok(()));
        assert_eq!(world.apply(Operation::Enter(WRONG)), Ok(()));
        assert_eq!(world.observable_state().credential, None);

        world.apply(Operation::Enter(RIGHT)).ok();
        world.apply(Operation::Enter(RIGHT)).ok();
        assert_eq!(world.observable_state().state, SessionState::Idle);
        assert_eq!(world.observable_state().credential, Some(RIGHT.digits()));
    }

    #[test]
    fn third_failure_locks_out() {
        let mut world = ModelWorld::new();
        world.apply(Operation::Enter(RIGHT)).ok();
        world.apply(Operation::Enter(RIGHT)).ok();
        world.apply(Operation::Select(ModelCommand::OpenDoor)).ok();
        for _ in 0..3 {
            world.apply(Operation::Enter(WRONG)).ok();
        }

        let state = world.observable_state();
        assert_eq!(state.state, SessionState::Idle);
        assert_eq!(state.lockouts, 1);
        assert_eq!(state.door_cycles, 0);
    }

    #[test]
    fn menu_ignores_digits() {
        let mut world = ModelWorld::new();
        assert_eq!(
            world.apply(Operation::Select(ModelCommand::OpenDoor)),
            Err(OperationError::NotExpected)
        );
    }
}

//! Session state table shared by both nodes.
//!
//! Control is authoritative and HMI mirrors it, but both advance through the
//! same [`SessionState::next`] table. A trigger that has no entry for the
//! current state is an [`ProtocolError::IllegalTransition`].
//!
//! ```text
//! AwaitingEnrollment --EnrollmentMatched--> Idle
//! AwaitingEnrollment --EnrollmentMismatched--> AwaitingEnrollment
//! Idle --CommandSelected(OpenDoor)--> AwaitingDoorVerification
//! Idle --CommandSelected(ChangePassword)--> AwaitingChangeVerification
//! AwaitingDoorVerification --RoundMatched--> DoorCycle
//! AwaitingChangeVerification --RoundMatched--> AwaitingEnrollment
//! Awaiting*Verification --RoundMismatched--> (same)
//! Awaiting*Verification --AttemptsExhausted--> Lockout
//! DoorCycle --DoorCycleComplete--> Idle
//! Lockout --LockoutElapsed--> Idle
//! ```

use std::{fmt, time::Duration};

use latchkey_proto::Command;

use crate::error::ProtocolError;

/// Verification rounds allowed before lockout.
pub const MAX_ATTEMPTS: u8 = 3;

/// Protocol session state. Exactly one is active per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No credential enrolled (first run) or replacing one after a verified
    /// change request.
    #[default]
    AwaitingEnrollment,
    /// Enrolled, waiting for a menu command.
    Idle,
    /// Verifying before a door cycle.
    AwaitingDoorVerification,
    /// Verifying before a credential change.
    AwaitingChangeVerification,
    /// Door opening, held open, closing.
    DoorCycle,
    /// Too many failed rounds; alarm raised for the lockout dwell.
    Lockout,
}

impl SessionState {
    /// Successor for `transition`, or `None` if the table has no entry.
    pub const fn next(self, transition: Transition) -> Option<Self> {
        use SessionState as S;
        use Transition as T;

        match (self, transition) {
            (S::AwaitingEnrollment, T::EnrollmentMatched) => Some(S::Idle),
            (S::AwaitingEnrollment, T::EnrollmentMismatched) => Some(S::AwaitingEnrollment),

            (S::Idle, T::CommandSelected(Command::OpenDoor)) => Some(S::AwaitingDoorVerification),
            (S::Idle, T::CommandSelected(Command::ChangePassword)) => {
                Some(S::AwaitingChangeVerification)
            },

            (S::AwaitingDoorVerification, T::RoundMatched) => Some(S::DoorCycle),
            (S::AwaitingChangeVerification, T::RoundMatched) => Some(S::AwaitingEnrollment),
            (S::AwaitingDoorVerification | S::AwaitingChangeVerification, T::RoundMismatched) => {
                Some(self)
            },
            (S::AwaitingDoorVerification | S::AwaitingChangeVerification, T::AttemptsExhausted) => {
                Some(S::Lockout)
            },

            (S::DoorCycle, T::DoorCycleComplete) => Some(S::Idle),
            (S::Lockout, T::LockoutElapsed) => Some(S::Idle),

            _ => None,
        }
    }

    /// Apply `transition` in place.
    pub fn advance(&mut self, transition: Transition) -> Result<Self, ProtocolError> {
        let next = self
            .next(transition)
            .ok_or(ProtocolError::IllegalTransition { from: *self, transition })?;
        *self = next;
        Ok(next)
    }

    /// True in the two verification states.
    pub const fn is_verifying(self) -> bool {
        matches!(self, Self::AwaitingDoorVerification | Self::AwaitingChangeVerification)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingEnrollment => "awaiting-enrollment",
            Self::Idle => "idle",
            Self::AwaitingDoorVerification => "awaiting-door-verification",
            Self::AwaitingChangeVerification => "awaiting-change-verification",
            Self::DoorCycle => "door-cycle",
            Self::Lockout => "lockout",
        };
        f.write_str(name)
    }
}

/// Trigger that moves the session from one state to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// Both enrollment entries were identical.
    EnrollmentMatched,
    /// Enrollment entries differed.
    EnrollmentMismatched,
    /// User picked a menu command.
    CommandSelected(Command),
    /// Verification candidate equals the stored credential.
    RoundMatched,
    /// Verification candidate differs, attempts remain.
    RoundMismatched,
    /// Verification candidate differs and it was the last attempt.
    AttemptsExhausted,
    /// Door closed again.
    DoorCycleComplete,
    /// Lockout dwell finished.
    LockoutElapsed,
}

/// Failed verification rounds in the current cycle, always in `[0, MAX_ATTEMPTS)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttemptCounter {
    failures: u8,
}

impl AttemptCounter {
    /// Fresh cycle.
    pub const fn new() -> Self {
        Self { failures: 0 }
    }

    /// Failures so far in this cycle.
    pub const fn failures(self) -> u8 {
        self.failures
    }

    /// Rounds still available, including the current one.
    pub const fn remaining(self) -> u8 {
        MAX_ATTEMPTS - self.failures
    }

    /// Start a fresh cycle.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Record a mismatched round and report which transition it causes.
    ///
    /// On the last allowed failure the counter resets, ready for the next
    /// cycle after lockout.
    pub fn record_failure(&mut self) -> Transition {
        self.failures += 1;
        if self.failures >= MAX_ATTEMPTS {
            self.failures = 0;
            Transition::AttemptsExhausted
        } else {
            Transition::RoundMismatched
        }
    }
}

/// Dwell durations both nodes must agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolTiming {
    /// How long the actuator drives open, and again closed.
    pub door_dwell: Duration,
    /// How long the alarm sounds after attempts are exhausted.
    pub lockout_dwell: Duration,
}

impl Default for ProtocolTiming {
    fn default() -> Self {
        Self { door_dwell: Duration::from_secs(15), lockout_dwell: Duration::from_secs(60) }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const ALL_STATES: [SessionState; 6] = [
        SessionState::AwaitingEnrollment,
        SessionState::Idle,
        SessionState::AwaitingDoorVerification,
        SessionState::AwaitingChangeVerification,
        SessionState::DoorCycle,
        SessionState::Lockout,
    ];

    const ALL_TRANSITIONS: [Transition; 9] = [
        Transition::EnrollmentMatched,
        Transition::EnrollmentMismatched,
        Transition::CommandSelected(Command::OpenDoor),
        Transition::CommandSelected(Command::ChangePassword),
        Transition::RoundMatched,
        Transition::RoundMismatched,
        Transition::AttemptsExhausted,
        Transition::DoorCycleComplete,
        Transition::LockoutElapsed,
    ];

    #[test]
    fn starts_awaiting_enrollment() {
        assert_eq!(SessionState::default(), SessionState::AwaitingEnrollment);
    }

    #[test]
    fn door_flow() {
        let mut state = SessionState::Idle;
        state.advance(Transition::CommandSelected(Command::OpenDoor)).unwrap();
        state.advance(Transition::RoundMismatched).unwrap();
        assert_eq!(state, SessionState::AwaitingDoorVerification);
        state.advance(Transition::RoundMatched).unwrap();
        assert_eq!(state, SessionState::DoorCycle);
        state.advance(Transition::DoorCycleComplete).unwrap();
        assert_eq!(state, SessionState::Idle);
    }

    #[test]
    fn change_flow_returns_to_enrollment() {
        let mut state = SessionState::Idle;
        state.advance(Transition::CommandSelected(Command::ChangePassword)).unwrap();
        assert_eq!(state.advance(Transition::RoundMatched), Ok(SessionState::AwaitingEnrollment));
        assert_eq!(state.advance(Transition::EnrollmentMismatched), Ok(SessionState::AwaitingEnrollment));
        assert_eq!(state.advance(Transition::EnrollmentMatched), Ok(SessionState::Idle));
    }

    #[test]
    fn exhausted_attempts_lock_out_from_either_verification() {
        for start in [SessionState::AwaitingDoorVerification, SessionState::AwaitingChangeVerification] {
            let mut state = start;
            state.advance(Transition::AttemptsExhausted).unwrap();
            assert_eq!(state, SessionState::Lockout);
            state.advance(Transition::LockoutElapsed).unwrap();
            assert_eq!(state, SessionState::Idle);
        }
    }

    #[test]
    fn illegal_transition_leaves_state_unchanged() {
        let mut state = SessionState::Lockout;
        let err = state.advance(Transition::RoundMatched).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::IllegalTransition { from: SessionState::Lockout, transition: Transition::RoundMatched }
        );
        assert_eq!(state, SessionState::Lockout);
    }

    #[test]
    fn table_size() {
        let legal = ALL_STATES
            .iter()
            .flat_map(|s| ALL_TRANSITIONS.iter().map(move |t| s.next(*t)))
            .filter(Option::is_some)
            .count();
        // 2 enrollment + 2 commands + 2*3 verification + door + lockout
        assert_eq!(legal, 12);
    }

    #[test]
    fn counter_exhausts_on_third_failure() {
        let mut attempts = AttemptCounter::new();
        assert_eq!(attempts.remaining(), 3);
        assert_eq!(attempts.record_failure(), Transition::RoundMismatched);
        assert_eq!(attempts.record_failure(), Transition::RoundMismatched);
        assert_eq!(attempts.remaining(), 1);
        assert_eq!(attempts.record_failure(), Transition::AttemptsExhausted);
        assert_eq!(attempts.failures(), 0);
    }

    proptest! {
        /// Failures never leave the counter outside [0, MAX_ATTEMPTS).
        #[test]
        fn prop_counter_bounded(resets in prop::collection::vec(any::<bool>(), 0..64)) {
            let mut attempts = AttemptCounter::new();
            for reset in resets {
                if reset {
                    attempts.reset();
                } else {
                    attempts.record_failure();
                }
                prop_assert!(attempts.failures() < MAX_ATTEMPTS);
            }
        }

        /// Any state reached from AwaitingEnrollment through legal transitions
        /// is one of the six states, and illegal triggers are rejected without
        /// changing it.
        #[test]
        fn prop_walk_stays_in_table(steps in prop::collection::vec(0usize..ALL_TRANSITIONS.len(), 0..64)) {
            let mut state = SessionState::default();
            for step in steps {
                let transition = ALL_TRANSITIONS[step];
                let before = state;
                match state.advance(transition) {
                    Ok(next) => prop_assert_eq!(Some(next), before.next(transition)),
                    Err(_) => prop_assert_eq!(state, before),
                }
                prop_assert!(ALL_STATES.contains(&state));
            }
        }
    }
}

//! Recorded outcome of one scenario run.

use std::time::Duration;

use latchkey_core::{SessionState, hal::Direction};
use latchkey_proto::PASSCODE_LEN;

use crate::peripherals::{DisplayEvent, Drive};

/// How one node finished.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeReport {
    /// Session state when the node stopped. `None` if it never started.
    pub state: Option<SessionState>,
    /// Error the node halted with, if any.
    pub error: Option<String>,
}

impl NodeReport {
    /// The node ran and stopped cleanly.
    pub fn is_clean(&self) -> bool {
        self.state.is_some() && self.error.is_none()
    }
}

/// Everything a scenario observed.
///
/// Motor and alarm offsets are measured on the Control host's clock from the
/// moment that host started.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct World {
    /// Control node result.
    pub control: NodeReport,
    /// HMI node result.
    pub hmi: NodeReport,
    /// Credential store contents after the run.
    pub credential: [u8; PASSCODE_LEN],
    /// Motor commands.
    pub motor: Vec<(Duration, Drive)>,
    /// Alarm switching, `true` when turned on.
    pub alarm: Vec<(Duration, bool)>,
    /// Everything drawn on the HMI display.
    pub display: Vec<DisplayEvent>,
    /// Presence sensor polls.
    pub presence_polls: u32,
}

impl World {
    /// Number of times the door started opening.
    pub fn door_cycles(&self) -> usize {
        self.motor.iter().filter(|(_, drive)| drive.direction == Direction::Open).count()
    }

    /// Number of times the alarm was switched on.
    pub fn lockouts(&self) -> usize {
        self.alarm.iter().filter(|(_, on)| *on).count()
    }

    /// Screens in the order they were shown.
    pub fn screens(&self) -> Vec<&str> {
        self.display
            .iter()
            .filter_map(|event| match event {
                DisplayEvent::Show(text) => Some(text.as_str()),
                DisplayEvent::Echo(_) => None,
            })
            .collect()
    }

    /// Characters echoed while typing.
    pub fn echoes(&self) -> usize {
        self.display.iter().filter(|event| matches!(event, DisplayEvent::Echo(_))).count()
    }

    /// Gap between each motor command and the one after it.
    pub fn motor_gaps(&self) -> Vec<(Direction, Direction, Duration)> {
        self.motor
            .windows(2)
            .map(|pair| {
                let (at, from) = pair[0];
                let (next, to) = pair[1];
                (from.direction, to.direction, next.saturating_sub(at))
            })
            .collect()
    }

    /// Stored credential as digits, if the store holds a valid one.
    pub fn credential_digits(&self) -> Option<[u8; PASSCODE_LEN]> {
        self.credential.iter().all(|byte| *byte <= 9).then_some(self.credential)
    }
}

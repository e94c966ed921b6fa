//! Peripheral stand-ins for running the Control node on a host.

use std::path::PathBuf;

use latchkey_core::hal::{Actuator, Alarm, Direction, PresenceSensor};

/// Motor that only logs what it was asked to do.
#[derive(Debug, Default)]
pub struct TracingActuator;

impl Actuator for TracingActuator {
    fn drive(&mut self, direction: Direction, power: u8) {
        tracing::info!(?direction, power, "motor");
    }
}

/// Buzzer that only logs.
#[derive(Debug, Default)]
pub struct TracingAlarm {
    sounding: bool,
}

impl TracingAlarm {
    /// Whether the alarm is currently on.
    pub const fn is_sounding(&self) -> bool {
        self.sounding
    }
}

impl Alarm for TracingAlarm {
    fn on(&mut self) {
        self.sounding = true;
        tracing::warn!("alarm on");
    }

    fn off(&mut self) {
        self.sounding = false;
        tracing::info!("alarm off");
    }
}

/// Presence reported while a flag file exists.
///
/// `touch` the file to simulate someone in the doorway, remove it to clear.
/// Without a path the doorway is always clear.
#[derive(Debug, Default)]
pub struct FlagFilePresence {
    flag: Option<PathBuf>,
}

impl FlagFilePresence {
    /// Sensor driven by `flag`, or always clear.
    pub const fn new(flag: Option<PathBuf>) -> Self {
        Self { flag }
    }
}

impl PresenceSensor for FlagFilePresence {
    fn is_detected(&mut self) -> bool {
        self.flag.as_ref().is_some_and(|path| path.exists())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn flag_file_presence() {
        let dir = tempfile::tempdir().unwrap();
        let flag = dir.path().join("someone-there");
        let mut sensor = FlagFilePresence::new(Some(flag.clone()));

        assert!(!sensor.is_detected());
        std::fs::write(&flag, b"").unwrap();
        assert!(sensor.is_detected());

        assert!(!FlagFilePresence::new(None).is_detected());
    }
}

//! Display contents.

use std::{borrow::Cow, fmt, time::Duration};

/// Everything the HMI ever shows. Lines are separated by `\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    /// Power-on banner.
    Banner,
    /// First enrollment entry.
    EnterPass,
    /// Confirming enrollment entry.
    ReEnterPass,
    /// Idle menu.
    Menu,
    /// Verification entry.
    EnterOldPass,
    /// Door driving open.
    DoorOpening,
    /// Door held open until the doorway clears.
    WaitForPeople,
    /// Door driving closed.
    DoorClosing,
    /// Lockout, with how long the keypad stays dead.
    Locked {
        /// Lockout dwell.
        wait: Duration,
    },
}

impl Screen {
    /// Text as rendered on the two-line display.
    pub fn text(self) -> Cow<'static, str> {
        let fixed = match self {
            Self::Banner => "Door System Lock",
            Self::EnterPass => "Enter Pass:",
            Self::ReEnterPass => "Re-Enter Pass:",
            Self::Menu => "+ : OPEN DOOR\n- : Change Pass",
            Self::EnterOldPass => "Enter Old Pass:",
            Self::DoorOpening => "Door Opening\nPlease Wait",
            Self::WaitForPeople => "Wait for people\nto enter",
            Self::DoorClosing => "Door Closing\nPlease Wait",
            Self::Locked { wait } => {
                return Cow::Owned(format!("SYSTEM LOCKED\nWait {}", wait_text(wait)));
            },
        };
        Cow::Borrowed(fixed)
    }
}

/// Whole minutes when they divide evenly, otherwise seconds rounded up.
fn wait_text(wait: Duration) -> String {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    let (count, unit) = if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{plural}")
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

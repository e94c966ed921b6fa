//! Fuzz target for the HMI engine
//!
//! The HMI mirrors Control's state from outcome bytes alone. Garbage from the
//! link must be reported as a desync, never mirrored into a door opening.
//!
//! # Invariants
//!
//! - NEVER panic
//! - An event the engine is not waiting for is rejected without a state change
//! - DoorCycle is only entered from a door verification
//! - Failures never exceed the attempt limit
//! - Every action taken in response to a link byte is a screen update

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use latchkey_core::{MAX_ATTEMPTS, ProtocolTiming, SessionState};
use latchkey_hmi::{HmiAction, HmiAwait, HmiEngine, HmiEvent};
use latchkey_proto::{Command, Passcode};

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzEvent {
    Passcode([u8; 5]),
    OpenDoor,
    ChangePassword,
    Byte(u8),
    DwellElapsed,
}

fuzz_target!(|events: Vec<FuzzEvent>| {
    let mut engine = HmiEngine::new(ProtocolTiming::default());

    for event in events {
        let event = match event {
            FuzzEvent::Passcode(digits) => match Passcode::from_bytes(digits.map(|d| d % 10)) {
                Ok(passcode) => HmiEvent::PasscodeEntered(passcode),
                Err(_) => continue,
            },
            FuzzEvent::OpenDoor => HmiEvent::MenuSelected(Command::OpenDoor),
            FuzzEvent::ChangePassword => HmiEvent::MenuSelected(Command::ChangePassword),
            FuzzEvent::Byte(byte) => HmiEvent::Byte(byte),
            FuzzEvent::DwellElapsed => HmiEvent::DwellElapsed,
        };

        let before = engine.state();
        let expected = matches!(
            (engine.awaiting(), event),
            (HmiAwait::Passcode, HmiEvent::PasscodeEntered(_))
                | (HmiAwait::Menu, HmiEvent::MenuSelected(_))
                | (HmiAwait::Link, HmiEvent::Byte(_))
                | (HmiAwait::Dwell(_), HmiEvent::DwellElapsed)
        );

        let Ok(actions) = engine.handle(event) else {
            if !expected {
                assert_eq!(engine.state(), before, "rejected event changed state");
            }
            return;
        };
        assert!(expected, "engine accepted {event:?} while awaiting something else");

        let after = engine.state();
        if after == SessionState::DoorCycle && before != SessionState::DoorCycle {
            assert_eq!(before, SessionState::AwaitingDoorVerification);
        }
        assert!(engine.attempts().failures() <= MAX_ATTEMPTS);
        if let HmiEvent::Byte(_) = event {
            assert!(actions.iter().all(|action| matches!(action, HmiAction::Show(_))));
        }
    }
});

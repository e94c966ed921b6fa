//! Fuzz target for the Control engine
//!
//! Link bytes come from the HMI and cannot be trusted; a corrupt or malicious
//! stream must never unlock the door or damage the stored credential.
//!
//! # Strategy
//!
//! - Event sequences: arbitrary link bytes, dwell expiries and presence
//!   clears, delivered whether or not the engine is waiting for them
//! - Framing probes: missing `Ready`, out-of-range digits, stray commands
//!
//! # Invariants
//!
//! - NEVER panic
//! - An event the engine is not waiting for is rejected without a state change
//! - The store only ever holds a blank or a complete valid credential
//! - The store only changes when enrollment completes
//! - The door only opens out of a door verification
//! - Lockout is only entered from a verification

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use latchkey_control::{ControlAction, ControlAwait, ControlConfig, ControlEngine, ControlEvent};
use latchkey_core::{
    SessionState,
    hal::{Direction, MemoryCredentialStore},
};
use latchkey_proto::{LinkCode, Passcode};

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzEvent {
    Byte(u8),
    /// A well-formed candidate, to get past framing more often.
    Candidate([u8; 5]),
    DwellElapsed,
    PresenceCleared,
}

#[derive(Debug, Arbitrary)]
struct Input {
    enrolled: Option<[u8; 5]>,
    events: Vec<FuzzEvent>,
}

fn valid_or_blank(bytes: [u8; 5]) -> bool {
    bytes == [0xff; 5] || bytes.iter().all(|byte| *byte <= 9)
}

fuzz_target!(|input: Input| {
    let enrolled = input.enrolled.and_then(|digits| Passcode::from_bytes(digits.map(|d| d % 10)).ok());
    let store = enrolled
        .as_ref()
        .map_or_else(MemoryCredentialStore::blank, MemoryCredentialStore::with_passcode);
    let config = ControlConfig { resume_enrolled: enrolled.is_some(), ..ControlConfig::default() };
    let mut engine = ControlEngine::new(store, config);

    for event in input.events {
        let events: Vec<ControlEvent> = match event {
            FuzzEvent::Byte(byte) => vec![ControlEvent::Byte(byte)],
            FuzzEvent::Candidate(digits) => std::iter::once(LinkCode::Ready.to_u8())
                .chain(digits.map(|d| d % 10))
                .map(ControlEvent::Byte)
                .collect(),
            FuzzEvent::DwellElapsed => vec![ControlEvent::DwellElapsed],
            FuzzEvent::PresenceCleared => vec![ControlEvent::PresenceCleared],
        };

        for event in events {
            let before = engine.state();
            let stored_before = engine.store().bytes();
            let expected = matches!(
                (engine.awaiting(), event),
                (ControlAwait::Link, ControlEvent::Byte(_))
                    | (ControlAwait::Dwell(_), ControlEvent::DwellElapsed)
                    | (ControlAwait::PresenceClear, ControlEvent::PresenceCleared)
            );

            let Ok(actions) = engine.handle(event) else {
                if !expected {
                    assert_eq!(engine.state(), before, "rejected event changed state");
                }
                // desync: a real node halts here
                return;
            };
            assert!(expected, "engine accepted {event:?} while awaiting something else");

            let after = engine.state();
            let stored_after = engine.store().bytes();
            assert!(valid_or_blank(stored_after), "store holds {stored_after:?}");
            if stored_after != stored_before {
                assert_eq!(before, SessionState::AwaitingEnrollment);
                assert_eq!(after, SessionState::Idle);
            }
            if after == SessionState::Lockout && before != SessionState::Lockout {
                assert!(before.is_verifying(), "lockout from {before}");
            }

            for action in &actions {
                if let ControlAction::Drive { direction: Direction::Open, .. } = action {
                    assert_eq!(before, SessionState::AwaitingDoorVerification);
                    assert_eq!(after, SessionState::DoorCycle);
                }
            }
        }
    }
});

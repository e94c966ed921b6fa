//! Fuzz target for the paired engines against the reference model
//!
//! Drives the real Control and HMI engines back to back with arbitrary user
//! scripts and compares them to the model after every operation.
//!
//! # Invariants
//!
//! - Control and HMI always rest in the same session state
//! - The pair accepts exactly the operations the model accepts
//! - Stored credential, door cycles and lockouts match the model

#![no_main]

use libfuzzer_sys::fuzz_target;
use latchkey_control::ControlConfig;
use latchkey_harness::{Lockstep, ModelWorld, Operation};

fuzz_target!(|ops: Vec<Operation>| {
    let mut model = ModelWorld::new();
    let mut pair = Lockstep::new(ControlConfig::default());

    for op in ops {
        let expected = model.apply(op).is_ok();
        let accepted = match op {
            Operation::Enter(code) => pair.enter(code.to_passcode()),
            Operation::Select(command) => pair.select(command.into()),
        };
        let accepted = match accepted {
            Ok(accepted) => accepted.is_ok(),
            Err(err) => panic!("pair failed on {op:?}: {err}"),
        };
        assert_eq!(accepted, expected, "{op:?}");

        let state = model.observable_state();
        assert_eq!(pair.control().state(), state.state);
        assert_eq!(pair.hmi().state(), state.state);
        assert_eq!(pair.door_cycles(), state.door_cycles);
        assert_eq!(pair.lockouts(), state.lockouts);
        let stored = pair.control().store().bytes();
        assert_eq!(stored.iter().all(|byte| *byte <= 9).then_some(stored), state.credential);
    }
});

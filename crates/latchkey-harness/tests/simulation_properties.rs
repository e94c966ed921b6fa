//! Property-based tests for simulation determinism.
//!
//! The same seed and key script must produce an identical world, down to the
//! timing of every motor and alarm command.

use std::sync::{Arc, Mutex};

use latchkey_harness::{
    Scenario, World,
    script::{keys_for, random_operations},
};
use proptest::prelude::*;

fn run_once(seed: u64, keys: &str, presence: &[u32]) -> World {
    let captured = Arc::new(Mutex::new(None));
    let captured_in_oracle = Arc::clone(&captured);

    let result = Scenario::new("determinism")
        .seed(seed)
        .keys(keys)
        .presence(presence)
        .oracle(Box::new(move |world| {
            *captured_in_oracle.lock().expect("mutex poisoned") = Some(world.clone());
            Ok(())
        }))
        .run();
    assert!(result.is_ok(), "{result:?}");

    captured.lock().expect("mutex poisoned").clone().expect("oracle should have captured the world")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_simulations_deterministic(
        seed in any::<u64>(),
        len in 0usize..24,
        presence in prop::collection::vec(0u32..20, 0..4),
    ) {
        let keys = keys_for(&random_operations(seed, len));

        let first = run_once(seed, &keys, &presence);
        let second = run_once(seed, &keys, &presence);

        // PROPERTY: same inputs produce the same world
        prop_assert_eq!(&first, &second, "keys {:?} diverged", keys);
    }
}

#[test]
fn open_door_timing_is_reproducible() {
    let keys = "12345=12345=+12345=+12345=";
    let first = run_once(42, keys, &[5, 1]);
    let second = run_once(42, keys, &[5, 1]);

    assert_eq!(first.door_cycles(), 2);
    assert_eq!(first.motor, second.motor);
}

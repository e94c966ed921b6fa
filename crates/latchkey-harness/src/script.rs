//! Seeded random user scripts.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::model::{ModelCommand, ModelPasscode, Operation};

/// `len` operations drawn from `seed`. The same seed always yields the same
/// script.
///
/// Passcode entries outnumber menu presses three to one so scripts get past
/// enrollment and through verification rounds.
pub fn random_operations(seed: u64, len: usize) -> Vec<Operation> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| match rng.gen_range(0..8u8) {
            0 => Operation::Select(ModelCommand::OpenDoor),
            1 => Operation::Select(ModelCommand::ChangePassword),
            _ => Operation::Enter(ModelPasscode(rng.r#gen())),
        })
        .collect()
}

/// Keypad text for `operations`.
pub fn keys_for(operations: &[Operation]) -> String {
    operations.iter().map(|op| op.keys()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_script() {
        assert_eq!(random_operations(7, 32), random_operations(7, 32));
    }

    #[test]
    fn keys_follow_operations() {
        let ops = [
            Operation::Enter(ModelPasscode(0)),
            Operation::Select(ModelCommand::ChangePassword),
        ];
        assert_eq!(keys_for(&ops), "12345=-");
    }
}

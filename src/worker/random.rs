// SPDX-License-Identifier: Apache-2.0 OR MIT
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Largest value a producer writes
pub const MAX_VALUE: u32 = 2_147_483;

/// One generator, seeded once, shared by every worker.
///
/// Draws are serialized through the mutex, so a given seed yields the same
/// sequence of draws regardless of which worker makes them.
#[derive(Debug)]
pub struct SharedRandom {
    rng: Mutex<StdRng>,
    max_delay_units: u32,
}

impl SharedRandom {
    /// Delays are drawn from `[0, capacity - 1]` units.
    pub fn new(seed: u64, capacity: usize) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            max_delay_units: capacity.saturating_sub(1) as u32,
        }
    }

    /// Number of delay units to sleep before the next transfer
    pub fn next_delay(&self) -> u32 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0..=self.max_delay_units)
    }

    /// Value for the next insert, in `[1, MAX_VALUE]`
    pub fn next_value(&self) -> u32 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(1..=MAX_VALUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges() {
        let random = SharedRandom::new(1, 9);
        for _ in 0..1000 {
            assert!(random.next_delay() <= 8);
            let value = random.next_value();
            assert!((1..=MAX_VALUE).contains(&value));
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = SharedRandom::new(42, 9);
        let b = SharedRandom::new(42, 9);
        let draws_a: Vec<_> = (0..16).map(|_| (a.next_delay(), a.next_value())).collect();
        let draws_b: Vec<_> = (0..16).map(|_| (b.next_delay(), b.next_value())).collect();
        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn test_capacity_one_never_delays() {
        let random = SharedRandom::new(7, 1);
        assert!((0..100).all(|_| random.next_delay() == 0));
    }
}

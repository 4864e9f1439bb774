//! RNG capability: `{ next_float(low, high), next_index(n) }`.
//! Successive calls are independent and uniform on their stated ranges; no
//! other contract is assumed by the rest of the core.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub trait Rand {
    fn next_float(&mut self, low: f32, high: f32) -> f32;
    fn next_index(&mut self, n: usize) -> usize;
}

/// Per-worker RNG backed by `rand`'s `SmallRng` (fast, non-cryptographic,
/// `Send` so each render worker owns one independently).
pub struct WorkerRng(SmallRng);

impl WorkerRng {
    pub fn from_seed(seed: u64) -> Self {
        WorkerRng(SmallRng::seed_from_u64(seed))
    }
}

impl Rand for WorkerRng {
    fn next_float(&mut self, low: f32, high: f32) -> f32 {
        self.0.gen_range(low..high)
    }

    fn next_index(&mut self, n: usize) -> usize {
        self.0.gen_range(0..n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_float_within_range() {
        let mut rng = WorkerRng::from_seed(42);
        for _ in 0..1000 {
            let v = rng.next_float(2.0, 5.0);
            assert!(v >= 2.0 && v < 5.0);
        }
    }

    #[test]
    fn next_index_within_bound() {
        let mut rng = WorkerRng::from_seed(7);
        for _ in 0..1000 {
            assert!(rng.next_index(4) < 4);
        }
    }
}

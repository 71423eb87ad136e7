//! Seeded randomness

use async_trait::async_trait;
use fabop_core::effects::RandomEffects;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;

/// Deterministic RNG: the same seed yields the same jitter sequence
#[derive(Clone)]
pub struct SeededRandomHandler {
    rng: Arc<Mutex<StdRng>>,
}

impl SeededRandomHandler {
    /// RNG seeded with `seed`
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(StdRng::seed_from_u64(seed))),
        }
    }
}

impl Default for SeededRandomHandler {
    fn default() -> Self {
        Self::new(42)
    }
}

#[async_trait]
impl RandomEffects for SeededRandomHandler {
    async fn random_u64(&self) -> u64 {
        self.rng.lock().next_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_seed_same_sequence() {
        let a = SeededRandomHandler::new(7);
        let b = SeededRandomHandler::new(7);
        for _ in 0..5 {
            assert_eq!(a.random_range(10, 30).await, b.random_range(10, 30).await);
        }
    }

    #[tokio::test]
    async fn range_is_inclusive_and_bounded() {
        let rng = SeededRandomHandler::default();
        for _ in 0..100 {
            let value = rng.random_range(10, 30).await;
            assert!((10..=30).contains(&value));
        }
        assert_eq!(rng.random_range(5, 5).await, 5);
    }
}

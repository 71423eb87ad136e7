//! Random effect handler
//!
//! Uses `rand::thread_rng()`; this is the handler layer where actual system
//! randomness is provided.

use async_trait::async_trait;
use fabop_core::effects::RandomEffects;
use rand::Rng;

/// Real random handler backed by the thread-local RNG
#[derive(Debug, Clone, Default)]
pub struct RealRandomHandler;

impl RealRandomHandler {
    /// Create a new real random handler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RandomEffects for RealRandomHandler {
    async fn random_u64(&self) -> u64 {
        rand::thread_rng().gen()
    }

    async fn random_range(&self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        rand::thread_rng().gen_range(low..=high)
    }
}

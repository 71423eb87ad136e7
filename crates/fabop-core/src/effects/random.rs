//! Random effects

use async_trait::async_trait;

/// Randomness for re-check jitter
#[async_trait]
pub trait RandomEffects: Send + Sync {
    /// Uniformly distributed 64-bit value.
    async fn random_u64(&self) -> u64;

    /// Value in the inclusive range `low..=high`. Returns `low` when the
    /// range is empty.
    async fn random_range(&self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        let span = high - low;
        match span.checked_add(1) {
            Some(width) => low + self.random_u64().await % width,
            None => self.random_u64().await,
        }
    }
}

/// Blanket implementation for Arc<T> where T: RandomEffects
#[async_trait]
impl<T: RandomEffects + ?Sized> RandomEffects for std::sync::Arc<T> {
    async fn random_u64(&self) -> u64 {
        (**self).random_u64().await
    }
}

//! Physical time effects
//!
//! Wall-clock time for request timestamps, restart deadlines and timer
//! deadlines. Production handlers delegate to the system clock and tokio;
//! test handlers are controllable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Wall-clock time and sleeping
#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    /// Current wall-clock time.
    async fn now(&self) -> DateTime<Utc>;

    /// Suspend the caller for `ms` milliseconds.
    async fn sleep_ms(&self, ms: u64);
}

/// Blanket implementation for Arc<T> where T: PhysicalTimeEffects
#[async_trait]
impl<T: PhysicalTimeEffects + ?Sized> PhysicalTimeEffects for std::sync::Arc<T> {
    async fn now(&self) -> DateTime<Utc> {
        (**self).now().await
    }

    async fn sleep_ms(&self, ms: u64) {
        (**self).sleep_ms(ms).await;
    }
}

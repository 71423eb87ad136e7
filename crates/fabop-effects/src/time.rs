//! Real time effect handler for production use

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fabop_core::effects::PhysicalTimeEffects;
use std::time::Duration;

/// Real time handler for production use
///
/// Stateless; delegates to the system clock and the tokio timer.
#[derive(Debug, Clone, Default)]
pub struct RealTimeHandler;

impl RealTimeHandler {
    /// Create a new real time handler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhysicalTimeEffects for RealTimeHandler {
    async fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep_ms(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

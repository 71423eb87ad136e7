//! Controllable clock for deterministic testing

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use fabop_core::effects::PhysicalTimeEffects;
use parking_lot::Mutex;
use std::sync::Arc;

struct State {
    now: DateTime<Utc>,
    sleeps: Vec<u64>,
}

/// Clock that only moves when told to, or when something sleeps on it
#[derive(Clone)]
pub struct ControllableClock {
    state: Arc<Mutex<State>>,
}

impl ControllableClock {
    /// Clock stopped at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                now: start,
                sleeps: Vec::new(),
            })),
        }
    }

    /// 2024-05-01T12:00:00Z
    pub fn default_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    /// Current fake time
    pub fn current(&self) -> DateTime<Utc> {
        self.state.lock().now
    }

    /// Move the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock();
        state.now += by;
    }

    /// Jump the clock to `now`
    pub fn set(&self, now: DateTime<Utc>) {
        self.state.lock().now = now;
    }

    /// Every sleep requested so far, in milliseconds
    pub fn sleeps(&self) -> Vec<u64> {
        self.state.lock().sleeps.clone()
    }
}

impl Default for ControllableClock {
    fn default() -> Self {
        Self::new(Self::default_start())
    }
}

#[async_trait]
impl PhysicalTimeEffects for ControllableClock {
    async fn now(&self) -> DateTime<Utc> {
        self.current()
    }

    /// Advances the clock by `ms` and yields once instead of blocking.
    async fn sleep_ms(&self, ms: u64) {
        {
            let mut state = self.state.lock();
            state.sleeps.push(ms);
            state.now += Duration::milliseconds(i64::try_from(ms).unwrap_or(i64::MAX));
        }
        tokio::task::yield_now().await;
    }
}

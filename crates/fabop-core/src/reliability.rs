//! Retry policies
//!
//! Bounded retry loops used by the engine: the three-attempt queue append,
//! conflict retries on document writes, and the restart action's conflict
//! budget. Delays are slept through [`PhysicalTimeEffects`] so tests with a
//! controllable clock never block.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::effects::PhysicalTimeEffects;

/// Backoff strategy for retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Linear increase: delay * attempt
    Linear,
    /// Exponential increase: delay * 2^attempt
    Exponential,
}

impl BackoffStrategy {
    /// Calculate delay for a given attempt number
    ///
    /// # Arguments
    /// - `attempt`: Zero-based attempt number (0 = first retry)
    /// - `initial_delay`: Base delay duration
    /// - `max_delay`: Maximum delay duration
    pub fn calculate_delay(
        &self,
        attempt: u32,
        initial_delay: Duration,
        max_delay: Duration,
    ) -> Duration {
        let delay = match self {
            BackoffStrategy::Fixed => initial_delay,
            BackoffStrategy::Linear => initial_delay.saturating_mul(attempt.saturating_add(1)),
            BackoffStrategy::Exponential => {
                initial_delay.saturating_mul(2u32.saturating_pow(attempt))
            }
        };

        delay.min(max_delay)
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay, in milliseconds
    pub max_delay_ms: u64,
    /// Backoff strategy to use
    pub strategy: BackoffStrategy,
}

impl RetryPolicy {
    /// Create a new retry policy with exponential backoff
    pub fn exponential() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 100,
            max_delay_ms: 5_000,
            strategy: BackoffStrategy::Exponential,
        }
    }

    /// Create a retry policy with fixed delay
    pub fn fixed(delay: Duration) -> Self {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Self {
            max_attempts: 3,
            initial_delay_ms: delay_ms,
            max_delay_ms: delay_ms,
            strategy: BackoffStrategy::Fixed,
        }
    }

    /// Set the total number of attempts
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Calculate delay for a specific attempt
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        self.strategy.calculate_delay(
            attempt,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }

    /// True if another attempt is allowed after `attempt` (zero-based) failed
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts
    }

    /// Execute an async operation, retrying every failure
    pub async fn execute<T, E, F, Fut, C>(&self, time: &C, operation: F) -> Result<T, E>
    where
        C: PhysicalTimeEffects + ?Sized,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_when(time, operation, |_| true).await
    }

    /// Execute an async operation, retrying only failures accepted by `retryable`
    pub async fn execute_when<T, E, F, Fut, C, R>(
        &self,
        time: &C,
        mut operation: F,
        retryable: R,
    ) -> Result<T, E>
    where
        C: PhysicalTimeEffects + ?Sized,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if !self.allows_retry(attempt) || !retryable(&err) {
                        return Err(err);
                    }

                    let delay = self.calculate_delay(attempt);
                    time.sleep_ms(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
                        .await;

                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential()
    }
}

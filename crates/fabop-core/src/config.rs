//! Restart engine configuration
//!
//! Durations are stored as whole seconds so the structure reads naturally
//! from the agent's TOML file (`[restart]` table). Every field has a default;
//! a missing table yields [`RestartConfig::default`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::reliability::RetryPolicy;
use crate::{FabopError, FabopResult};

/// Upper bound accepted for any configured duration (one week).
const MAX_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Timing and retry settings of the restart engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartConfig {
    /// Minimum spacing between two restarts for the same reason
    pub wait_time_secs: u64,
    /// How long a restarted component may stay `Waiting` before it expires
    pub timeout_secs: u64,
    /// Lower bound of the re-check jitter interval
    pub jitter_min_secs: u64,
    /// Upper bound of the re-check jitter interval (inclusive)
    pub jitter_max_secs: u64,
    /// Attempts for appending to a restart queue
    pub queue_retry: RetryPolicy,
    /// Attempts for conflicting document writes
    pub store_retry: RetryPolicy,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            wait_time_secs: 10 * 60,
            timeout_secs: 10 * 60,
            jitter_min_secs: 10,
            jitter_max_secs: 30,
            queue_retry: RetryPolicy::fixed(Duration::from_secs(1)),
            store_retry: RetryPolicy::exponential(),
        }
    }
}

impl RestartConfig {
    /// Debounce window between two restarts for the same reason
    pub fn wait_time(&self) -> chrono::Duration {
        seconds(self.wait_time_secs)
    }

    /// Deadline for a restarted component to show a new pod
    pub fn timeout(&self) -> chrono::Duration {
        seconds(self.timeout_secs)
    }

    /// Re-check jitter range in seconds, clamped like every other duration
    /// and never inverted, so an unvalidated config cannot overflow a deadline.
    pub fn jitter_bounds(&self) -> (u64, u64) {
        let max = self.jitter_max_secs.min(MAX_DURATION_SECS);
        (self.jitter_min_secs.min(max), max)
    }

    /// Validate the configuration
    pub fn validate(&self) -> FabopResult<()> {
        if self.timeout_secs == 0 {
            return Err(FabopError::invalid("restart.timeout_secs must be positive"));
        }
        if self.jitter_min_secs > self.jitter_max_secs {
            return Err(FabopError::invalid(format!(
                "restart jitter range is empty: {}s > {}s",
                self.jitter_min_secs, self.jitter_max_secs
            )));
        }
        for (field, value) in [
            ("wait_time_secs", self.wait_time_secs),
            ("timeout_secs", self.timeout_secs),
            ("jitter_max_secs", self.jitter_max_secs),
        ] {
            if value > MAX_DURATION_SECS {
                return Err(FabopError::invalid(format!(
                    "restart.{field} exceeds {MAX_DURATION_SECS}s"
                )));
            }
        }
        if self.queue_retry.max_attempts == 0 || self.store_retry.max_attempts == 0 {
            return Err(FabopError::invalid("retry policies need at least one attempt"));
        }
        Ok(())
    }
}

fn seconds(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(secs.min(MAX_DURATION_SECS)).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_operator_behavior() {
        let config = RestartConfig::default();
        assert_eq!(config.wait_time(), chrono::Duration::minutes(10));
        assert_eq!(config.timeout(), chrono::Duration::minutes(10));
        assert_eq!(config.queue_retry.max_attempts, 3);
        assert_eq!(config.queue_retry.initial_delay_ms, 1_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_inverted_jitter() {
        let config = RestartConfig {
            jitter_min_secs: 40,
            ..RestartConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn jitter_bounds_are_clamped_and_ordered() {
        let config = RestartConfig {
            jitter_min_secs: u64::MAX,
            jitter_max_secs: 10_000_000_000_000,
            ..RestartConfig::default()
        };
        assert_eq!(config.jitter_bounds(), (MAX_DURATION_SECS, MAX_DURATION_SECS));
        assert_eq!(RestartConfig::default().jitter_bounds(), (10, 30));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: RestartConfig = toml::from_str("wait_time_secs = 60\n").unwrap();
        assert_eq!(config.wait_time(), chrono::Duration::minutes(1));
        assert_eq!(config.jitter_max_secs, 30);
    }
}

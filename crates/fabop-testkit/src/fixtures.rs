//! Common fixtures

use chrono::Duration;
use fabop_core::{Instance, RestartConfig};

/// Namespace used by fixture instances
pub const TEST_NAMESPACE: &str = "fabric";

/// Peer in [`TEST_NAMESPACE`]
pub fn peer(name: &str, tenant: &str) -> Instance {
    Instance::peer(name, TEST_NAMESPACE, tenant)
}

/// Orderer in [`TEST_NAMESPACE`]
pub fn orderer(name: &str, tenant: &str) -> Instance {
    Instance::orderer(name, TEST_NAMESPACE, tenant)
}

/// CA in [`TEST_NAMESPACE`]
pub fn ca(name: &str, tenant: &str) -> Instance {
    Instance::ca(name, TEST_NAMESPACE, tenant)
}

/// Console in [`TEST_NAMESPACE`]
pub fn console(name: &str) -> Instance {
    Instance::console(name, TEST_NAMESPACE)
}

/// Default engine config with jitter pinned to `jitter_secs`
pub fn config_with_jitter(jitter_secs: u64) -> RestartConfig {
    RestartConfig {
        jitter_min_secs: jitter_secs,
        jitter_max_secs: jitter_secs,
        ..RestartConfig::default()
    }
}

/// Minutes as a chrono duration
pub fn minutes(count: i64) -> Duration {
    Duration::minutes(count)
}

/// Let spawned tasks (timers) run to their next await point
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

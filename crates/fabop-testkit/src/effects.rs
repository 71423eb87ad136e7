//! Composite test effects
//!
//! [`TestEffects`] implements every effect trait the engine needs by
//! delegating to one stateful handler per concern. All handlers share their
//! state across clones, so a test keeps a clone to script and inspect while
//! the engine owns another.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fabop_core::effects::{
    ConfigMapData, ConfigMapEffects, ConfigMapError, ConfigMapWrite, DeploymentEffects,
    DeploymentError, PhysicalTimeEffects, PodEffects, PodError, PodIdentity, RandomEffects,
};

use crate::config_maps::MemoryConfigMapHandler;
use crate::deployments::RecordingDeploymentHandler;
use crate::pods::ScriptedPodHandler;
use crate::random::SeededRandomHandler;
use crate::time::ControllableClock;

/// In-memory effects for engine tests; every handler is shared by clones
#[derive(Clone, Default)]
pub struct TestEffects {
    /// Versioned ConfigMap store
    pub config_maps: MemoryConfigMapHandler,
    /// Deployment restart recorder
    pub deployments: RecordingDeploymentHandler,
    /// Scripted ready pods
    pub pods: ScriptedPodHandler,
    /// Manually advanced clock
    pub clock: ControllableClock,
    /// Deterministic RNG
    pub random: SeededRandomHandler,
}

impl TestEffects {
    /// Effects with the default seed and start time
    pub fn new() -> Self {
        Self::default()
    }

    /// Effects with a specific RNG seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            random: SeededRandomHandler::new(seed),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ConfigMapEffects for TestEffects {
    async fn get_config_map(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<ConfigMapData>, ConfigMapError> {
        self.config_maps.get_config_map(name, namespace).await
    }

    async fn put_config_map(&self, write: ConfigMapWrite) -> Result<String, ConfigMapError> {
        self.config_maps.put_config_map(write).await
    }
}

#[async_trait]
impl DeploymentEffects for TestEffects {
    async fn restart_deployment(&self, name: &str, namespace: &str) -> Result<(), DeploymentError> {
        self.deployments.restart_deployment(name, namespace).await
    }
}

#[async_trait]
impl PodEffects for TestEffects {
    async fn list_ready_pods(
        &self,
        label_selector: &str,
        namespace: &str,
    ) -> Result<Vec<PodIdentity>, PodError> {
        self.pods.list_ready_pods(label_selector, namespace).await
    }
}

#[async_trait]
impl PhysicalTimeEffects for TestEffects {
    async fn now(&self) -> DateTime<Utc> {
        self.clock.now().await
    }

    async fn sleep_ms(&self, ms: u64) {
        self.clock.sleep_ms(ms).await;
    }
}

#[async_trait]
impl RandomEffects for TestEffects {
    async fn random_u64(&self) -> u64 {
        self.random.random_u64().await
    }
}

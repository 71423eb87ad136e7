//! Composite production effects
//!
//! Bundles the Kubernetes, clock and RNG handlers into one value that
//! satisfies `RestartEffects`, so the engine's services take a single
//! `Arc<KubeEffects>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fabop_core::effects::{
    ConfigMapData, ConfigMapEffects, ConfigMapError, ConfigMapWrite, DeploymentEffects,
    DeploymentError, PhysicalTimeEffects, PodEffects, PodError, PodIdentity, RandomEffects,
};
use kube::Client;

use crate::k8s::{KubeConfigMapHandler, KubeDeploymentHandler, KubePodHandler};
use crate::{RealRandomHandler, RealTimeHandler};

/// All production handlers behind one value
#[derive(Clone)]
pub struct KubeEffects {
    config_maps: KubeConfigMapHandler,
    deployments: KubeDeploymentHandler,
    pods: KubePodHandler,
    time: RealTimeHandler,
    random: RealRandomHandler,
}

impl KubeEffects {
    /// Production handlers sharing one Kubernetes client
    pub fn new(client: Client) -> Self {
        Self {
            config_maps: KubeConfigMapHandler::new(client.clone()),
            deployments: KubeDeploymentHandler::new(client.clone()),
            pods: KubePodHandler::new(client),
            time: RealTimeHandler::new(),
            random: RealRandomHandler::new(),
        }
    }
}

#[async_trait]
impl ConfigMapEffects for KubeEffects {
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
impl DeploymentEffects for KubeEffects {
    async fn restart_deployment(&self, name: &str, namespace: &str) -> Result<(), DeploymentError> {
        self.deployments.restart_deployment(name, namespace).await
    }
}

#[async_trait]
impl PodEffects for KubeEffects {
    async fn list_ready_pods(
        &self,
        label_selector: &str,
        namespace: &str,
    ) -> Result<Vec<PodIdentity>, PodError> {
        self.pods.list_ready_pods(label_selector, namespace).await
    }
}

#[async_trait]
impl PhysicalTimeEffects for KubeEffects {
    async fn now(&self) -> DateTime<Utc> {
        self.time.now().await
    }

    async fn sleep_ms(&self, ms: u64) {
        self.time.sleep_ms(ms).await;
    }
}

#[async_trait]
impl RandomEffects for KubeEffects {
    async fn random_u64(&self) -> u64 {
        self.random.random_u64().await
    }

    async fn random_range(&self, low: u64, high: u64) -> u64 {
        self.random.random_range(low, high).await
    }
}

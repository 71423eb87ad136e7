use async_trait::async_trait;
use fabop_core::effects::{ConfigMapData, ConfigMapEffects, ConfigMapError, ConfigMapWrite};
use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::{Api, ObjectMeta, PostParams};
use kube::Client;
use tracing::debug;

use super::is_conflict;

/// ConfigMap handler over the Kubernetes API
#[derive(Clone)]
pub struct KubeConfigMapHandler {
    client: Client,
}

impl KubeConfigMapHandler {
    /// Handler over `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ConfigMapEffects for KubeConfigMapHandler {
    async fn get_config_map(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<ConfigMapData>, ConfigMapError> {
        let config_map = self
            .api(namespace)
            .get_opt(name)
            .await
            .map_err(|e| ConfigMapError::Api {
                name: name.to_string(),
                namespace: namespace.to_string(),
                message: e.to_string(),
            })?;

        Ok(config_map.map(|cm| ConfigMapData {
            data: cm.data.unwrap_or_default(),
            resource_version: cm.metadata.resource_version,
        }))
    }

    async fn put_config_map(&self, write: ConfigMapWrite) -> Result<String, ConfigMapError> {
        let api = self.api(&write.namespace);
        let config_map = ConfigMap {
            metadata: ObjectMeta {
                name: Some(write.name.clone()),
                namespace: Some(write.namespace.clone()),
                labels: Some(write.labels),
                resource_version: write.resource_version.clone(),
                ..ObjectMeta::default()
            },
            data: Some(write.data),
            ..ConfigMap::default()
        };

        let params = PostParams::default();
        let result = match write.resource_version {
            Some(_) => api.replace(&write.name, &params, &config_map).await,
            None => api.create(&params, &config_map).await,
        };

        match result {
            Ok(stored) => {
                let version = stored.metadata.resource_version.unwrap_or_default();
                debug!(name = %write.name, namespace = %write.namespace, %version, "configmap written");
                Ok(version)
            }
            Err(e) if is_conflict(&e) => Err(ConfigMapError::Conflict {
                name: write.name,
                namespace: write.namespace,
            }),
            Err(e) => Err(ConfigMapError::Api {
                name: write.name,
                namespace: write.namespace,
                message: e.to_string(),
            }),
        }
    }
}

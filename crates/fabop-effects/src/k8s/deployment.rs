use async_trait::async_trait;
use chrono::Utc;
use fabop_core::effects::{DeploymentEffects, DeploymentError, RESTARTED_AT_ANNOTATION};
use fabop_core::RetryPolicy;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, PostParams};
use kube::Client;
use std::time::Duration;
use tracing::{info, warn};

use super::is_conflict;
use crate::RealTimeHandler;

/// Deployment restart handler over the Kubernetes API
///
/// Restarts by bumping the pod-template `restartedAt` annotation, the same
/// mechanism as `kubectl rollout restart`. The replace carries the fetched
/// resource version; conflicts refetch and retry within `retry`.
#[derive(Clone)]
pub struct KubeDeploymentHandler {
    client: Client,
    retry: RetryPolicy,
}

impl KubeDeploymentHandler {
    /// Handler over `client`
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry: RetryPolicy::fixed(Duration::from_millis(200)),
        }
    }

    async fn restart_once(
        &self,
        api: &Api<Deployment>,
        name: &str,
        namespace: &str,
    ) -> Result<(), RestartAttemptError> {
        let api_error = |e: kube::Error| DeploymentError::Api {
            name: name.to_string(),
            namespace: namespace.to_string(),
            message: e.to_string(),
        };

        let mut deployment = api
            .get_opt(name)
            .await
            .map_err(|e| RestartAttemptError::Failed(api_error(e)))?
            .ok_or_else(|| {
                RestartAttemptError::Failed(DeploymentError::NotFound {
                    name: name.to_string(),
                    namespace: namespace.to_string(),
                })
            })?;

        let template = &mut deployment.spec.get_or_insert_with(Default::default).template;
        template
            .metadata
            .get_or_insert_with(Default::default)
            .annotations
            .get_or_insert_with(Default::default)
            .insert(RESTARTED_AT_ANNOTATION.to_string(), Utc::now().to_rfc3339());

        match api.replace(name, &PostParams::default(), &deployment).await {
            Ok(_) => Ok(()),
            Err(e) if is_conflict(&e) => Err(RestartAttemptError::Conflict),
            Err(e) => Err(RestartAttemptError::Failed(api_error(e))),
        }
    }
}

enum RestartAttemptError {
    Conflict,
    Failed(DeploymentError),
}

#[async_trait]
impl DeploymentEffects for KubeDeploymentHandler {
    async fn restart_deployment(&self, name: &str, namespace: &str) -> Result<(), DeploymentError> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let api = &api;

        let result = self
            .retry
            .execute_when(
                &RealTimeHandler,
                move || async move { self.restart_once(api, name, namespace).await },
                |err| {
                    let retry = matches!(err, RestartAttemptError::Conflict);
                    if retry {
                        warn!(deployment = name, namespace, "restart conflicted, retrying");
                    }
                    retry
                },
            )
            .await;

        match result {
            Ok(()) => {
                info!(deployment = name, namespace, "rolling restart triggered");
                Ok(())
            }
            Err(RestartAttemptError::Conflict) => Err(DeploymentError::ConflictRetriesExhausted {
                name: name.to_string(),
                namespace: namespace.to_string(),
                attempts: self.retry.max_attempts,
            }),
            Err(RestartAttemptError::Failed(err)) => Err(err),
        }
    }
}

use async_trait::async_trait;
use fabop_core::effects::{PodEffects, PodError, PodIdentity};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube::Client;

/// Pod listing handler over the Kubernetes API
#[derive(Clone)]
pub struct KubePodHandler {
    client: Client,
}

impl KubePodHandler {
    /// Handler over `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Running, `Ready=True` and not terminating.
pub fn is_ready_pod(pod: &Pod) -> bool {
    if pod.metadata.deletion_timestamp.is_some() {
        return false;
    }
    let Some(status) = pod.status.as_ref() else {
        return false;
    };
    let running = status.phase.as_deref() == Some("Running");
    let ready = status.conditions.as_ref().is_some_and(|conditions| {
        conditions
            .iter()
            .any(|c| c.type_ == "Ready" && c.status == "True")
    });
    running && ready
}

#[async_trait]
impl PodEffects for KubePodHandler {
    async fn list_ready_pods(
        &self,
        label_selector: &str,
        namespace: &str,
    ) -> Result<Vec<PodIdentity>, PodError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pods = api
            .list(&ListParams::default().labels(label_selector))
            .await
            .map_err(|e| PodError {
                selector: label_selector.to_string(),
                namespace: namespace.to_string(),
                message: e.to_string(),
            })?;

        Ok(pods
            .items
            .iter()
            .filter(|pod| is_ready_pod(pod))
            .filter_map(|pod| pod.metadata.name.clone())
            .map(PodIdentity::new)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{PodCondition, PodStatus};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
    use kube::api::ObjectMeta;

    fn pod(phase: &str, ready: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("peer1-5d9c".to_string()),
                ..ObjectMeta::default()
            },
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                conditions: Some(vec![PodCondition {
                    type_: "Ready".to_string(),
                    status: ready.to_string(),
                    ..PodCondition::default()
                }]),
                ..PodStatus::default()
            }),
            ..Pod::default()
        }
    }

    #[test]
    fn running_ready_pod_is_ready() {
        assert!(is_ready_pod(&pod("Running", "True")));
    }

    #[test]
    fn unready_or_pending_pods_are_skipped() {
        assert!(!is_ready_pod(&pod("Running", "False")));
        assert!(!is_ready_pod(&pod("Pending", "True")));
        assert!(!is_ready_pod(&Pod::default()));
    }

    #[test]
    fn terminating_pod_is_skipped() {
        let mut terminating = pod("Running", "True");
        terminating.metadata.deletion_timestamp = Some(Time(chrono::Utc::now()));
        assert!(!is_ready_pod(&terminating));
    }
}

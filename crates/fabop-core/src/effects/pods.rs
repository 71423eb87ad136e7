//! Pod listing effect

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type for pod listing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("listing pods {selector} in {namespace}: {message}")]
pub struct PodError {
    /// Label selector that was listed
    pub selector: String,
    /// Namespace that was listed
    pub namespace: String,
    /// Underlying API failure
    pub message: String,
}

/// Identity of a running, ready pod.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PodIdentity {
    /// Pod name
    pub name: String,
}

impl PodIdentity {
    /// Identity of the pod named `name`
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Ready pod listing by label selector
#[async_trait]
pub trait PodEffects: Send + Sync {
    /// Pods matching `label_selector` that are running, ready and not terminating.
    async fn list_ready_pods(
        &self,
        label_selector: &str,
        namespace: &str,
    ) -> Result<Vec<PodIdentity>, PodError>;
}

/// Blanket implementation for Arc<T> where T: PodEffects
#[async_trait]
impl<T: PodEffects + ?Sized> PodEffects for std::sync::Arc<T> {
    async fn list_ready_pods(
        &self,
        label_selector: &str,
        namespace: &str,
    ) -> Result<Vec<PodIdentity>, PodError> {
        (**self).list_ready_pods(label_selector, namespace).await
    }
}

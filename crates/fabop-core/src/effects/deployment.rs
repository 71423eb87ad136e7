//! Deployment restart effect
//!
//! A single idempotent primitive: trigger a rolling restart of a named
//! deployment by stamping its pod template. Handlers retry write conflicts
//! a bounded number of times before giving up.

use async_trait::async_trait;

/// Pod-template annotation bumped to force a rollout.
pub const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

/// Error type for deployment operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeploymentError {
    /// The deployment does not exist
    #[error("deployment {namespace}/{name} not found")]
    NotFound {
        /// Deployment name
        name: String,
        /// Deployment namespace
        namespace: String,
    },
    /// Every attempt lost a write race
    #[error("deployment {namespace}/{name} still conflicting after {attempts} attempts")]
    ConflictRetriesExhausted {
        /// Deployment name
        name: String,
        /// Deployment namespace
        namespace: String,
        /// Attempts made
        attempts: u32,
    },
    /// Any other API failure
    #[error("deployment {namespace}/{name}: {message}")]
    Api {
        /// Deployment name
        name: String,
        /// Deployment namespace
        namespace: String,
        /// API error message
        message: String,
    },
}

/// Rolling restarts of deployments
#[async_trait]
pub trait DeploymentEffects: Send + Sync {
    /// Trigger a rolling restart of `name` in `namespace`.
    async fn restart_deployment(&self, name: &str, namespace: &str) -> Result<(), DeploymentError>;
}

/// Blanket implementation for Arc<T> where T: DeploymentEffects
#[async_trait]
impl<T: DeploymentEffects + ?Sized> DeploymentEffects for std::sync::Arc<T> {
    async fn restart_deployment(&self, name: &str, namespace: &str) -> Result<(), DeploymentError> {
        (**self).restart_deployment(name, namespace).await
    }
}

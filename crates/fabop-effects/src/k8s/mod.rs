//! Kubernetes-backed handlers
//!
//! Each handler wraps a cloned `kube::Client` and talks to one resource kind.
//! API failures are mapped onto the narrow error enums of the corresponding
//! effect trait; HTTP 409 becomes a conflict so callers can retry.

mod config_map;
mod deployment;
mod pods;

pub use config_map::KubeConfigMapHandler;
pub use deployment::KubeDeploymentHandler;
pub use pods::{is_ready_pod, KubePodHandler};

/// HTTP status the API server returns for version and existence conflicts.
const CONFLICT: u16 = 409;

fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == CONFLICT)
}

//! Recording deployment restarter

use async_trait::async_trait;
use fabop_core::effects::{DeploymentEffects, DeploymentError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Default)]
struct State {
    restarts: Vec<String>,
    missing: HashSet<String>,
    failing: HashSet<String>,
}

/// Deployment handler that records every restart instead of performing it.
/// Every deployment exists unless marked missing.
#[derive(Clone, Default)]
pub struct RecordingDeploymentHandler {
    state: Arc<Mutex<State>>,
}

fn key(name: &str, namespace: &str) -> String {
    format!("{namespace}/{name}")
}

impl RecordingDeploymentHandler {
    /// Handler with no restarts recorded
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `name` as not found from now on
    pub fn mark_missing(&self, name: &str, namespace: &str) {
        self.state.lock().missing.insert(key(name, namespace));
    }

    /// Fail every restart of `name` with an API error until [`Self::recover`]
    pub fn fail_restarts_of(&self, name: &str, namespace: &str) {
        self.state.lock().failing.insert(key(name, namespace));
    }

    /// Let restarts of `name` succeed again
    pub fn recover(&self, name: &str, namespace: &str) {
        self.state.lock().failing.remove(&key(name, namespace));
    }

    /// Restarted deployments as `namespace/name`, in call order
    pub fn restarts(&self) -> Vec<String> {
        self.state.lock().restarts.clone()
    }

    /// Number of recorded restarts of `name`
    pub fn restart_count(&self, name: &str, namespace: &str) -> usize {
        let key = key(name, namespace);
        self.state
            .lock()
            .restarts
            .iter()
            .filter(|restarted| **restarted == key)
            .count()
    }
}

#[async_trait]
impl DeploymentEffects for RecordingDeploymentHandler {
    async fn restart_deployment(&self, name: &str, namespace: &str) -> Result<(), DeploymentError> {
        let mut state = self.state.lock();
        let key = key(name, namespace);
        if state.missing.contains(&key) {
            return Err(DeploymentError::NotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            });
        }
        if state.failing.contains(&key) {
            return Err(DeploymentError::Api {
                name: name.to_string(),
                namespace: namespace.to_string(),
                message: "injected failure".to_string(),
            });
        }
        state.restarts.push(key);
        Ok(())
    }
}

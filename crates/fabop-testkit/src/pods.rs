//! Scripted pod listing

use async_trait::async_trait;
use fabop_core::effects::{PodEffects, PodError, PodIdentity};
use fabop_core::pod_selector;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct State {
    ready: HashMap<(String, String), Vec<String>>,
    failures: u32,
    listings: usize,
}

/// Pod handler returning whatever the test scripted per instance
#[derive(Clone, Default)]
pub struct ScriptedPodHandler {
    state: Arc<Mutex<State>>,
}

impl ScriptedPodHandler {
    /// Handler reporting no pods
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the ready pods of instance `cr_name`
    pub fn set_ready_pods(&self, cr_name: &str, namespace: &str, pods: &[&str]) {
        self.state.lock().ready.insert(
            (namespace.to_string(), pod_selector(cr_name)),
            pods.iter().map(|pod| (*pod).to_string()).collect(),
        );
    }

    /// Fail the next `count` listings
    pub fn fail_listings(&self, count: u32) {
        self.state.lock().failures = count;
    }

    /// Number of listings served, failed ones included
    pub fn listing_count(&self) -> usize {
        self.state.lock().listings
    }
}

#[async_trait]
impl PodEffects for ScriptedPodHandler {
    async fn list_ready_pods(
        &self,
        label_selector: &str,
        namespace: &str,
    ) -> Result<Vec<PodIdentity>, PodError> {
        let mut state = self.state.lock();
        state.listings += 1;
        if state.failures > 0 {
            state.failures -= 1;
            return Err(PodError {
                selector: label_selector.to_string(),
                namespace: namespace.to_string(),
                message: "injected failure".to_string(),
            });
        }
        Ok(state
            .ready
            .get(&(namespace.to_string(), label_selector.to_string()))
            .map(|pods| pods.iter().map(PodIdentity::new).collect())
            .unwrap_or_default())
    }
}

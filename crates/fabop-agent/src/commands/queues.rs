//! `fabop queues`: print restart queue documents

use anyhow::{Context, Result};
use fabop_core::{ComponentType, RestartConfig};
use fabop_effects::KubeEffects;
use fabop_restart::StaggerRestartService;
use kube::Client;
use std::sync::Arc;

/// Print the restart document of `component`, or of every component type
/// (the console's restart log included) when none is given.
pub async fn handle_queues(
    namespace: &str,
    component: Option<ComponentType>,
    restart: RestartConfig,
) -> Result<()> {
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let service = StaggerRestartService::new(Arc::new(KubeEffects::new(client)), restart);

    let kinds = component.map_or_else(|| ComponentType::ALL.to_vec(), |kind| vec![kind]);
    for kind in kinds {
        let snapshot = service
            .queue_snapshot(kind, namespace)
            .await
            .with_context(|| format!("Failed to load {}", kind.restart_config_name()))?;
        println!("# {namespace}/{}", kind.restart_config_name());
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}

//! `fabop run`: drive restart queues until shut down

use anyhow::{Context as _, Result};
use fabop_effects::KubeEffects;
use fabop_restart::StaggerRestartService;
use kube::Client;
use std::sync::Arc;
use tracing::info;

use crate::config::AgentConfig;
use crate::controller::{self, Context};

pub async fn handle_run(config: AgentConfig) -> Result<()> {
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let effects = Arc::new(KubeEffects::new(client.clone()));

    info!(
        namespaces = ?config.namespaces,
        wait_time_secs = config.restart.wait_time_secs,
        timeout_secs = config.restart.timeout_secs,
        "starting restart queue controller"
    );

    let ctx = Context {
        stagger: StaggerRestartService::new(effects, config.restart.clone()),
        requeue: config.requeue(),
        error_requeue: config.error_requeue(),
    };
    controller::run(client, &config.namespaces, ctx).await;
    Ok(())
}

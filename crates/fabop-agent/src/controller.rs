//! Restart queue controller
//!
//! Watches the restart documents the engine writes and advances the queue of
//! each `<type>-restart-config` ConfigMap. A pass that leaves a restart
//! waiting for its new pod is requeued after `requeue_secs`; everything else
//! waits for the next change to the document.

use fabop_core::{ComponentType, FabopError};
use fabop_effects::KubeEffects;
use fabop_restart::{document_label_selector, StaggerRestartService};
use futures::future::join_all;
use futures::StreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::runtime::controller::Action;
use kube::runtime::{watcher, Controller};
use kube::{Api, Client};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Shared state handed to every reconcile
pub struct Context {
    pub stagger: StaggerRestartService<KubeEffects>,
    pub requeue: Duration,
    pub error_requeue: Duration,
}

/// Staggered component type a ConfigMap holds the queues of, if any
fn queue_kind(config_map: &ConfigMap) -> Option<ComponentType> {
    let name = config_map.metadata.name.as_deref()?;
    ComponentType::from_restart_config_name(name).filter(ComponentType::is_staggered)
}

async fn reconcile(config_map: Arc<ConfigMap>, ctx: Arc<Context>) -> Result<Action, FabopError> {
    let Some(kind) = queue_kind(&config_map) else {
        return Ok(Action::await_change());
    };
    let namespace = config_map
        .metadata
        .namespace
        .as_deref()
        .ok_or_else(|| FabopError::invalid("restart document without namespace"))?;

    if ctx.stagger.reconcile(kind, namespace).await? {
        debug!(component_type = %kind, namespace, "restart still in progress, requeueing");
        Ok(Action::requeue(ctx.requeue))
    } else {
        Ok(Action::await_change())
    }
}

fn error_policy(config_map: Arc<ConfigMap>, err: &FabopError, ctx: Arc<Context>) -> Action {
    error!(
        document = config_map.metadata.name.as_deref().unwrap_or_default(),
        namespace = config_map.metadata.namespace.as_deref().unwrap_or_default(),
        error = %err,
        "queue reconcile failed"
    );
    Action::requeue(ctx.error_requeue)
}

async fn run_for(api: Api<ConfigMap>, scope: String, ctx: Arc<Context>) {
    info!(scope = %scope, "watching restart queues");
    let config = watcher::Config::default().labels(&document_label_selector());
    Controller::new(api, config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((object, _)) => debug!(document = %object.name, "reconciled"),
                Err(err) => warn!(error = %err, "controller event failed"),
            }
        })
        .await;
    info!(scope = %scope, "queue controller stopped");
}

/// Run one controller per namespace (or a single cluster-wide one) until
/// ctrl-c or SIGTERM.
pub async fn run(client: Client, namespaces: &[String], ctx: Context) {
    let ctx = Arc::new(ctx);
    if namespaces.is_empty() {
        run_for(Api::all(client), "all namespaces".to_string(), ctx).await;
        return;
    }

    join_all(namespaces.iter().map(|namespace| {
        run_for(
            Api::namespaced(client.clone(), namespace),
            namespace.clone(),
            Arc::clone(&ctx),
        )
    }))
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;

    fn config_map(name: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("fabric".to_string()),
                ..ObjectMeta::default()
            },
            ..ConfigMap::default()
        }
    }

    #[test]
    fn only_staggered_queue_documents_are_reconciled() {
        assert_eq!(
            queue_kind(&config_map("peer-restart-config")),
            Some(ComponentType::Peer)
        );
        assert_eq!(
            queue_kind(&config_map("orderer-restart-config")),
            Some(ComponentType::Orderer)
        );
        assert_eq!(queue_kind(&config_map("console-restart-config")), None);
        assert_eq!(queue_kind(&config_map("operator-config")), None);
    }
}

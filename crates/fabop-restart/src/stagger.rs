//! Staggered restart service
//!
//! Serializes restarts of one component type per tenant (organization).
//! Each `<type>-restart-config` document holds a FIFO queue per tenant;
//! only the head of a queue ever progresses:
//!
//! ```text
//! Pending ──restart issued──▶ Waiting ──new pod seen──▶ Completed
//!    │                           └──deadline passed──▶ Expired
//!    └──deployment gone──▶ Deleted
//! ```
//!
//! Terminal entries leave the queue for the append-only `log`, which makes
//! the next entry the head on the following pass. Progress is driven by
//! [`StaggerRestartService::reconcile`], called periodically by the agent.
//!
//! Console instances are never queued: there is one per network, so they are
//! restarted immediately and logged as `Restarted`.

use chrono::{DateTime, Duration, Utc};
use fabop_core::effects::{DeploymentError, PodIdentity, RestartEffects};
use fabop_core::{
    pod_selector, ComponentStatus, ComponentType, FabopError, FabopResult, Instance,
    QueueComponent, RestartConfig, RestartQueueConfig,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::store::ConfigStore;

/// Change to one tenant queue's head, computed from a snapshot and applied
/// to the freshly loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
enum HeadTransition {
    /// Head stays queued with updated fields
    Update {
        tenant: String,
        observed: ComponentStatus,
        component: QueueComponent,
    },
    /// Head leaves the queue for the log
    Retire {
        tenant: String,
        observed: ComponentStatus,
        component: QueueComponent,
    },
}

impl HeadTransition {
    fn apply(&self, queues: &mut RestartQueueConfig) -> bool {
        match self {
            HeadTransition::Update {
                tenant,
                observed,
                component,
            } => queues.replace_head(tenant, *observed, component.clone()),
            HeadTransition::Retire {
                tenant,
                observed,
                component,
            } => queues.retire_head(tenant, *observed, component.clone()),
        }
    }
}

/// What one pass decided for one queue head
#[derive(Debug)]
struct HeadOutcome {
    transition: Option<HeadTransition>,
    requeue: bool,
}

impl HeadOutcome {
    fn unchanged(requeue: bool) -> Self {
        Self {
            transition: None,
            requeue,
        }
    }

    fn update(
        tenant: &str,
        observed: ComponentStatus,
        component: QueueComponent,
        requeue: bool,
    ) -> Self {
        Self {
            transition: Some(HeadTransition::Update {
                tenant: tenant.to_string(),
                observed,
                component,
            }),
            requeue,
        }
    }

    fn retire(tenant: &str, observed: ComponentStatus, component: QueueComponent) -> Self {
        Self {
            transition: Some(HeadTransition::Retire {
                tenant: tenant.to_string(),
                observed,
                component,
            }),
            requeue: false,
        }
    }
}

/// Per-tenant restart queues for ca, peer and orderer instances
pub struct StaggerRestartService<E> {
    effects: Arc<E>,
    store: ConfigStore<E>,
    config: RestartConfig,
}

impl<E> Clone for StaggerRestartService<E> {
    fn clone(&self) -> Self {
        Self {
            effects: Arc::clone(&self.effects),
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<E> StaggerRestartService<E>
where
    E: RestartEffects + 'static,
{
    /// Service over `effects`; queue documents are read and written through
    /// a [`ConfigStore`] using `config.store_retry`.
    pub fn new(effects: Arc<E>, config: RestartConfig) -> Self {
        let store = ConfigStore::new(Arc::clone(&effects), config.store_retry.clone());
        Self {
            effects,
            store,
            config,
        }
    }

    /// Engine configuration this service was built with
    pub fn config(&self) -> &RestartConfig {
        &self.config
    }

    /// Restart `instance`: immediately for the console, queued otherwise.
    pub async fn restart(&self, instance: &Instance, reason: &str) -> FabopResult<()> {
        match instance.kind() {
            ComponentType::Console => self.restart_immediately(instance, reason).await,
            ComponentType::Ca | ComponentType::Peer | ComponentType::Orderer => {
                self.add_to_queue(instance, reason).await
            }
        }
    }

    /// Append a pending restart of `instance` to its tenant's queue.
    pub async fn add_to_queue(&self, instance: &Instance, reason: &str) -> FabopResult<()> {
        let document = instance.kind().restart_config_name();
        let component = QueueComponent::pending(instance.name(), reason);

        let store = &self.store;
        let document = document.as_str();
        let namespace = instance.namespace();
        let tenant = instance.tenant_key();
        let component = &component;

        self.config
            .queue_retry
            .execute(self.effects.as_ref(), move || async move {
                let result = store
                    .update(document, namespace, |queues: &mut RestartQueueConfig| {
                        queues.add_to_queue(tenant, component.clone());
                        true
                    })
                    .await;
                if let Err(err) = &result {
                    warn!(instance = %component.cr_name, namespace, error = %err, "failed to enqueue restart, retrying");
                }
                result
            })
            .await?;

        info!(
            instance = instance.name(),
            namespace,
            tenant,
            reason,
            component_type = %instance.kind(),
            "restart queued"
        );
        Ok(())
    }

    /// Restart without queueing and record the restart in the log.
    pub async fn restart_immediately(&self, instance: &Instance, reason: &str) -> FabopResult<()> {
        let namespace = instance.namespace();
        info!(instance = instance.name(), namespace, reason, "restarting immediately");

        self.effects
            .restart_deployment(instance.deployment_name(), namespace)
            .await
            .map_err(|e| FabopError::from(e).context(format!("restarting {}", instance.key())))?;

        let now = self.effects.now().await;
        let component = QueueComponent::restarted(instance.name(), reason, now);
        let document = instance.kind().restart_config_name();
        self.store
            .update(&document, namespace, |queues: &mut RestartQueueConfig| {
                queues.add_to_log(component.clone());
                true
            })
            .await?;
        Ok(())
    }

    /// Read-only view of a queue document
    pub async fn queue_snapshot(
        &self,
        component_type: ComponentType,
        namespace: &str,
    ) -> FabopResult<RestartQueueConfig> {
        let document = component_type.restart_config_name();
        Ok(self.store.load(&document, namespace).await?.value)
    }

    /// Advance the head of every tenant queue of `component_type` by at most
    /// one step. Returns `true` when the caller should call again soon even
    /// without an external trigger (some head is still waiting).
    ///
    /// A failing head does not hold back the other tenants: every queue is
    /// visited, their transitions are persisted, the failing head stays as it
    /// was and the first error is returned.
    pub async fn reconcile(
        &self,
        component_type: ComponentType,
        namespace: &str,
    ) -> FabopResult<bool> {
        let document = component_type.restart_config_name();
        let snapshot: RestartQueueConfig = self.store.load(&document, namespace).await?.value;

        let mut requeue = false;
        let mut transitions = Vec::new();
        let mut failure = None;

        for (tenant, queue) in &snapshot.queues {
            let Some(head) = queue.first() else {
                continue;
            };
            match self.advance_head(tenant, head, namespace).await {
                Ok(outcome) => {
                    requeue |= outcome.requeue;
                    transitions.extend(outcome.transition);
                }
                Err(err) => {
                    warn!(
                        instance = %head.cr_name,
                        tenant = %tenant,
                        namespace,
                        error = %err,
                        "queue head failed to advance"
                    );
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
        }

        if transitions.is_empty() {
            debug!(document = %document, namespace, requeue, "no queue changes");
        } else {
            let transitions = &transitions;
            self.store
                .update(&document, namespace, |queues: &mut RestartQueueConfig| {
                    transitions
                        .iter()
                        .fold(false, |changed, transition| transition.apply(queues) || changed)
                })
                .await?;
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(requeue),
        }
    }

    async fn advance_head(
        &self,
        tenant: &str,
        head: &QueueComponent,
        namespace: &str,
    ) -> FabopResult<HeadOutcome> {
        match head.status {
            ComponentStatus::Pending => self.start_restart(tenant, head, namespace).await,
            ComponentStatus::Waiting => self.check_restart(tenant, head, namespace).await,
            other => {
                warn!(instance = %head.cr_name, tenant, status = ?other, "unexpected status at queue head, moving to log");
                Ok(HeadOutcome::retire(tenant, other, head.clone()))
            }
        }
    }

    async fn start_restart(
        &self,
        tenant: &str,
        head: &QueueComponent,
        namespace: &str,
    ) -> FabopResult<HeadOutcome> {
        let pods = self.ready_pods(&head.cr_name, namespace).await;
        let mut component = head.clone();
        component.pod_name = pods.first().map(|pod| pod.name.clone());

        match self
            .effects
            .restart_deployment(&head.cr_name, namespace)
            .await
        {
            Ok(()) => {}
            Err(DeploymentError::NotFound { .. }) => {
                info!(instance = %head.cr_name, tenant, namespace, "deployment gone, dropping queued restart");
                component.status = ComponentStatus::Deleted;
                return Ok(HeadOutcome::retire(tenant, ComponentStatus::Pending, component));
            }
            Err(err) => {
                return Err(FabopError::from(err)
                    .context(format!("restarting {namespace}/{}", head.cr_name)));
            }
        }

        let now = self.effects.now().await;
        component.status = ComponentStatus::Waiting;
        component.last_checked_at = Some(now);
        component.check_until_at = Some(now + self.config.timeout());
        info!(
            instance = %head.cr_name,
            tenant,
            namespace,
            pod = component.pod_name.as_deref().unwrap_or(""),
            "restart issued, waiting for new pod"
        );
        Ok(HeadOutcome::update(tenant, ComponentStatus::Pending, component, true))
    }

    async fn check_restart(
        &self,
        tenant: &str,
        head: &QueueComponent,
        namespace: &str,
    ) -> FabopResult<HeadOutcome> {
        let pods = self.ready_pods(&head.cr_name, namespace).await;
        let now = self.effects.now().await;
        let mut component = head.clone();

        // More than one ready pod means the rollout is still in progress.
        if let [pod] = pods.as_slice() {
            if component.pod_name.as_deref() != Some(pod.name.as_str()) {
                info!(instance = %head.cr_name, tenant, namespace, pod = %pod.name, "restart completed");
                component.status = ComponentStatus::Completed;
                return Ok(HeadOutcome::retire(tenant, ComponentStatus::Waiting, component));
            }
        }

        if component.check_until_at.map_or(true, |deadline| now > deadline) {
            warn!(instance = %head.cr_name, tenant, namespace, "no new pod before deadline, restart expired");
            component.status = ComponentStatus::Expired;
            return Ok(HeadOutcome::retire(tenant, ComponentStatus::Waiting, component));
        }

        if self.recheck_due(component.last_checked_at, now).await {
            component.last_checked_at = Some(now);
            return Ok(HeadOutcome::update(tenant, ComponentStatus::Waiting, component, true));
        }

        Ok(HeadOutcome::unchanged(true))
    }

    /// Whether a jittered interval has passed since the last recorded check
    async fn recheck_due(&self, last_checked: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        let Some(last_checked) = last_checked else {
            return true;
        };
        let (min, max) = self.config.jitter_bounds();
        let jitter_secs = self.effects.random_range(min, max).await.min(max);
        let jitter = Duration::seconds(i64::try_from(jitter_secs).unwrap_or(0));
        now > last_checked + jitter
    }

    /// Ready pods of `cr_name`; listing failures degrade to none
    async fn ready_pods(&self, cr_name: &str, namespace: &str) -> Vec<PodIdentity> {
        match self
            .effects
            .list_ready_pods(&pod_selector(cr_name), namespace)
            .await
        {
            Ok(pods) => pods,
            Err(err) => {
                warn!(instance = cr_name, namespace, error = %err, "pod listing failed, treating as no pods");
                Vec::new()
            }
        }
    }
}

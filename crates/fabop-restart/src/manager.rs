//! Restart request tracking
//!
//! Collaborating reconcilers report *why* an instance needs a restart; the
//! manager coalesces those requests in the namespace's `operator-config`
//! document and decides *when* the restart is issued. A request is acted on
//! right away unless the same reason restarted the instance within the
//! debounce window, in which case a one-shot timer defers it.
//!
//! The restart itself is delegated to the [`StaggerRestartService`].

use chrono::{DateTime, Utc};
use fabop_core::effects::RestartEffects;
use fabop_core::{
    CertKind, FabopResult, Instance, RestartConfig, RestartManagerConfig, RestartReason,
    RestartRequest,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::stagger::StaggerRestartService;
use crate::store::{ConfigStore, OPERATOR_CONFIG};
use crate::timers::TimerRegistry;

/// Result of a [`RestartManager::trigger_if_needed`] check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Nothing pending for the instance
    Idle,
    /// Pending requests were completed and handed to the restart service
    Restarted(Vec<RestartReason>),
    /// Still inside the debounce window; a timer fires at `until`
    Deferred {
        /// When the deferred restart is due
        until: DateTime<Utc>,
        /// False when a timer for the instance was already pending
        armed: bool,
    },
}

/// Tracks restart requests per instance and triggers debounced restarts
pub struct RestartManager<E> {
    effects: Arc<E>,
    store: ConfigStore<E>,
    stagger: StaggerRestartService<E>,
    config: RestartConfig,
    timers: TimerRegistry,
}

impl<E> Clone for RestartManager<E> {
    fn clone(&self) -> Self {
        Self {
            effects: Arc::clone(&self.effects),
            store: self.store.clone(),
            stagger: self.stagger.clone(),
            config: self.config.clone(),
            timers: self.timers.clone(),
        }
    }
}

impl<E> RestartManager<E>
where
    E: RestartEffects + 'static,
{
    /// Manager with its own restart service built from `config`
    pub fn new(effects: Arc<E>, config: RestartConfig) -> Self {
        let stagger = StaggerRestartService::new(Arc::clone(&effects), config.clone());
        Self::with_stagger(effects, config, stagger)
    }

    /// Build a manager sharing an existing restart service
    pub fn with_stagger(
        effects: Arc<E>,
        config: RestartConfig,
        stagger: StaggerRestartService<E>,
    ) -> Self {
        let store = ConfigStore::new(Arc::clone(&effects), config.store_retry.clone());
        Self {
            effects,
            store,
            stagger,
            config,
            timers: TimerRegistry::new(),
        }
    }

    /// Restart service this manager hands restarts to
    pub fn stagger(&self) -> &StaggerRestartService<E> {
        &self.stagger
    }

    /// Request a restart because an admin certificate changed
    pub async fn for_admin_cert_update(&self, instance: &Instance) -> FabopResult<()> {
        self.for_reason(RestartReason::AdminCertUpdate, instance).await
    }

    /// Request a restart because an enrollment or TLS certificate was renewed
    pub async fn for_cert_update(&self, cert: CertKind, instance: &Instance) -> FabopResult<()> {
        self.for_reason(RestartReason::from(cert), instance).await
    }

    /// Request a restart because the config override changed
    pub async fn for_config_override(&self, instance: &Instance) -> FabopResult<()> {
        self.for_reason(RestartReason::ConfigOverride, instance).await
    }

    /// Request a restart after a version migration
    pub async fn for_migration(&self, instance: &Instance) -> FabopResult<()> {
        self.for_reason(RestartReason::Migration, instance).await
    }

    /// Request a restart because NodeOU support was toggled
    pub async fn for_node_ou(&self, instance: &Instance) -> FabopResult<()> {
        self.for_reason(RestartReason::NodeOU, instance).await
    }

    /// Request a restart because a mounted ConfigMap changed
    pub async fn for_config_map_update(&self, instance: &Instance) -> FabopResult<()> {
        self.for_reason(RestartReason::ConfigMapUpdate, instance).await
    }

    /// Request a restart explicitly asked for on the custom resource
    pub async fn for_restart_action(&self, instance: &Instance) -> FabopResult<()> {
        self.for_reason(RestartReason::RestartAction, instance).await
    }

    /// Record a pending restart request. Re-requesting a reason that is
    /// already pending keeps the original request time and writes nothing.
    pub async fn for_reason(&self, reason: RestartReason, instance: &Instance) -> FabopResult<()> {
        let now = self.effects.now().await;
        let name = instance.name();
        let written = self
            .store
            .update(
                OPERATOR_CONFIG,
                instance.namespace(),
                |doc: &mut RestartManagerConfig| doc.request(name, reason, now),
            )
            .await?;

        if written {
            info!(
                instance = name,
                namespace = instance.namespace(),
                reason = %reason,
                "restart requested"
            );
        } else {
            debug!(instance = name, reason = %reason, "restart already pending");
        }
        Ok(())
    }

    /// Restart `instance` if any pending request is eligible, otherwise make
    /// sure a timer will restart it once the debounce window closes.
    pub async fn trigger_if_needed(&self, instance: &Instance) -> FabopResult<TriggerOutcome> {
        let doc: RestartManagerConfig = self
            .store
            .load(OPERATOR_CONFIG, instance.namespace())
            .await?
            .value;

        let Some(state) = doc.instance(instance.name()).filter(|s| s.has_pending()) else {
            return Ok(TriggerOutcome::Idle);
        };

        let wait_time = self.config.wait_time();
        if state.any_eligible(wait_time) {
            let reasons = self.restart_pending(instance).await?;
            return Ok(if reasons.is_empty() {
                TriggerOutcome::Idle
            } else {
                TriggerOutcome::Restarted(reasons)
            });
        }

        let now = self.effects.now().await;
        let until = state.next_trigger_at(wait_time).unwrap_or(now);
        let delay_ms = u64::try_from((until - now).num_milliseconds()).unwrap_or(0);
        let armed = self.arm_timer(instance, delay_ms);

        debug!(
            instance = instance.name(),
            namespace = instance.namespace(),
            until = %until,
            armed,
            "restart deferred"
        );
        Ok(TriggerOutcome::Deferred { until, armed })
    }

    /// Mark every pending request of `instance` complete without restarting.
    pub async fn clear_restart_config(
        &self,
        instance: &Instance,
    ) -> FabopResult<Vec<RestartReason>> {
        let now = self.effects.now().await;
        let name = instance.name();
        let mut cleared = Vec::new();
        self.store
            .update(
                OPERATOR_CONFIG,
                instance.namespace(),
                |doc: &mut RestartManagerConfig| {
                    cleared = doc.complete_pending(name, now);
                    !cleared.is_empty()
                },
            )
            .await?;
        Ok(cleared)
    }

    /// Reasons still pending for `instance`, in stable order
    pub async fn pending_reasons(&self, instance: &Instance) -> FabopResult<Vec<RestartReason>> {
        let doc: RestartManagerConfig = self
            .store
            .load(OPERATOR_CONFIG, instance.namespace())
            .await?
            .value;
        Ok(doc
            .instance(instance.name())
            .map(|state| state.pending_reasons())
            .unwrap_or_default())
    }

    /// True while a deferred restart of `instance` is scheduled
    pub fn has_timer(&self, instance: &Instance) -> bool {
        self.timers.is_armed(&instance.key())
    }

    /// Abort every deferred restart; persisted requests are picked up again
    /// by the next trigger check.
    pub fn cancel_timers(&self) {
        self.timers.cancel_all();
    }

    /// Complete everything pending for `instance` and hand it to the restart
    /// service. Returns the reasons restarted, empty if nothing was pending.
    /// If the hand-off fails the requests are reopened so the next trigger
    /// check retries them.
    async fn restart_pending(&self, instance: &Instance) -> FabopResult<Vec<RestartReason>> {
        let now = self.effects.now().await;
        let name = instance.name();
        let mut reasons = Vec::new();
        let mut previous = BTreeMap::new();
        self.store
            .update(
                OPERATOR_CONFIG,
                instance.namespace(),
                |doc: &mut RestartManagerConfig| {
                    previous = doc
                        .instance(name)
                        .map(|state| state.requests.clone())
                        .unwrap_or_default();
                    reasons = doc.complete_pending(name, now);
                    !reasons.is_empty()
                },
            )
            .await?;

        if reasons.is_empty() {
            return Ok(reasons);
        }

        let joined = RestartReason::join(&reasons);
        info!(
            instance = name,
            namespace = instance.namespace(),
            tenant = instance.tenant_key(),
            reason = %joined,
            component_type = %instance.kind(),
            "triggering restart"
        );
        if let Err(err) = self.stagger.restart(instance, &joined).await {
            previous.retain(|reason, _| reasons.contains(reason));
            self.reopen(instance, &previous, now).await;
            return Err(err);
        }
        Ok(reasons)
    }

    async fn reopen(
        &self,
        instance: &Instance,
        previous: &BTreeMap<RestartReason, RestartRequest>,
        completed_at: DateTime<Utc>,
    ) {
        let name = instance.name();
        let result = self
            .store
            .update(
                OPERATOR_CONFIG,
                instance.namespace(),
                |doc: &mut RestartManagerConfig| doc.reopen(name, previous, completed_at),
            )
            .await;
        match result {
            Ok(false) => {}
            Ok(true) => warn!(
                instance = name,
                namespace = instance.namespace(),
                "restart failed, requests reopened"
            ),
            Err(err) => error!(
                instance = name,
                namespace = instance.namespace(),
                error = %err,
                "restart failed and requests could not be reopened"
            ),
        }
    }

    fn arm_timer(&self, instance: &Instance, delay_ms: u64) -> bool {
        let key = instance.key();
        let manager = self.clone();
        let instance = instance.clone();
        self.timers.arm(&key, async move {
            manager.effects.sleep_ms(delay_ms).await;
            match manager.restart_pending(&instance).await {
                Ok(reasons) if reasons.is_empty() => {
                    debug!(instance = instance.name(), "timer fired with nothing pending");
                }
                Ok(_) => {}
                Err(err) => {
                    error!(
                        instance = instance.name(),
                        namespace = instance.namespace(),
                        error = %err,
                        "deferred restart failed"
                    );
                }
            }
        })
    }
}

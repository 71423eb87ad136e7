//! Persisted restart documents
//!
//! Two documents carry all restart engine state:
//!
//! - [`RestartManagerConfig`], one per namespace, records which instances have
//!   pending restart requests and why.
//! - [`RestartQueueConfig`], one per component type and namespace, holds the
//!   per-tenant FIFO queues and the append-only restart log.
//!
//! Both are plain serde structures; the methods here are the only mutations
//! the engine performs on them, so every invariant lives in this module.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::RestartReason;

/// ConfigMap data key every restart document is stored under
pub const DOCUMENT_KEY: &str = "restart-config.yaml";

// =============================================================================
// Restart requests
// =============================================================================

/// Lifecycle of a restart request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Waiting for a restart
    Pending,
    /// A restart was issued, or nothing was ever requested
    #[default]
    Complete,
}

/// One reason's request state for one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartRequest {
    /// Whether a restart is still owed
    pub status: RequestStatus,
    /// Start of the current pending episode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_at: Option<DateTime<Utc>>,
    /// When a restart was last issued for this reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action_at: Option<DateTime<Utc>>,
}

impl RestartRequest {
    /// True while a restart is owed for this reason
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }

    /// Open a pending episode. Returns false if one is already open, in which
    /// case `requested_at` is left untouched.
    pub fn mark_requested(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_pending() {
            return false;
        }
        self.status = RequestStatus::Pending;
        self.requested_at = Some(now);
        true
    }

    /// Close the pending episode because a restart was issued.
    pub fn mark_complete(&mut self, now: DateTime<Utc>) {
        self.status = RequestStatus::Complete;
        self.last_action_at = Some(now);
        self.requested_at = None;
    }

    /// A pending request may restart right away when no restart was ever
    /// issued for its reason, or when it was requested at least `wait_time`
    /// after the previous one.
    pub fn is_eligible(&self, wait_time: Duration) -> bool {
        if !self.is_pending() {
            return false;
        }
        match (self.requested_at, self.last_action_at) {
            (_, None) => true,
            // malformed episode; restart rather than stall forever
            (None, Some(_)) => true,
            (Some(requested), Some(last)) => requested - last >= wait_time,
        }
    }
}

/// Requests of a single instance, keyed by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRestartState {
    /// Request state per reason
    #[serde(default)]
    pub requests: BTreeMap<RestartReason, RestartRequest>,
}

impl InstanceRestartState {
    /// Record `reason` as pending. Returns true if the state changed.
    pub fn request(&mut self, reason: RestartReason, now: DateTime<Utc>) -> bool {
        self.requests.entry(reason).or_default().mark_requested(now)
    }

    /// Reasons with an open request, in stable order
    pub fn pending_reasons(&self) -> Vec<RestartReason> {
        self.requests
            .iter()
            .filter(|(_, request)| request.is_pending())
            .map(|(reason, _)| *reason)
            .collect()
    }

    /// True if any reason has an open request
    pub fn has_pending(&self) -> bool {
        self.requests.values().any(RestartRequest::is_pending)
    }

    /// True if some pending request may restart right away
    pub fn any_eligible(&self, wait_time: Duration) -> bool {
        self.requests
            .values()
            .any(|request| request.is_eligible(wait_time))
    }

    /// When the oldest pending request becomes due: its last restart plus
    /// `wait_time`. Derived only from persisted timestamps so a restarted
    /// process computes the same deadline.
    pub fn next_trigger_at(&self, wait_time: Duration) -> Option<DateTime<Utc>> {
        self.requests
            .values()
            .filter(|request| request.is_pending())
            .filter_map(|request| {
                request
                    .requested_at
                    .zip(request.last_action_at)
                    .map(|(requested, last)| (requested, last + wait_time))
            })
            .min_by_key(|(requested, _)| *requested)
            .map(|(_, deadline)| deadline)
    }

    /// Complete every pending request, returning the reasons in stable order.
    pub fn complete_pending(&mut self, now: DateTime<Utc>) -> Vec<RestartReason> {
        let mut completed = Vec::new();
        for (reason, request) in self.requests.iter_mut() {
            if request.is_pending() {
                request.mark_complete(now);
                completed.push(*reason);
            }
        }
        completed
    }

    /// Undo a [`Self::complete_pending`] made at `completed_at` whose restart
    /// was never issued, putting each request back to its `previous` state.
    /// Requests completed again since then are left alone.
    pub fn reopen(
        &mut self,
        previous: &BTreeMap<RestartReason, RestartRequest>,
        completed_at: DateTime<Utc>,
    ) -> bool {
        let mut changed = false;
        for (reason, before) in previous {
            match self.requests.get_mut(reason) {
                Some(request) if request.last_action_at == Some(completed_at) => {
                    *request = before.clone();
                    changed = true;
                }
                _ => {}
            }
        }
        changed
    }
}

/// Namespace-wide request document, stored as `operator-config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartManagerConfig {
    /// Request state per instance name
    #[serde(default)]
    pub instances: BTreeMap<String, InstanceRestartState>,
}

impl RestartManagerConfig {
    /// Request state of instance `name`
    pub fn instance(&self, name: &str) -> Option<&InstanceRestartState> {
        self.instances.get(name)
    }

    /// Record `reason` for `instance`. Returns true if the document changed.
    pub fn request(&mut self, instance: &str, reason: RestartReason, now: DateTime<Utc>) -> bool {
        let created = !self.instances.contains_key(instance);
        let state = self.instances.entry(instance.to_string()).or_default();
        state.request(reason, now) || created
    }

    /// Complete all pending requests of `instance`.
    pub fn complete_pending(&mut self, instance: &str, now: DateTime<Utc>) -> Vec<RestartReason> {
        self.instances
            .get_mut(instance)
            .map(|state| state.complete_pending(now))
            .unwrap_or_default()
    }

    /// Undo a completion of `instance`'s requests made at `completed_at`.
    pub fn reopen(
        &mut self,
        instance: &str,
        previous: &BTreeMap<RestartReason, RestartRequest>,
        completed_at: DateTime<Utc>,
    ) -> bool {
        self.instances
            .get_mut(instance)
            .is_some_and(|state| state.reopen(previous, completed_at))
    }
}

// =============================================================================
// Restart queues
// =============================================================================

/// Progress of a queued restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Queued, restart not yet issued
    Pending,
    /// Restart issued, waiting for a new pod
    Waiting,
    /// New pod observed
    Completed,
    /// No new pod observed before the deadline
    Expired,
    /// Deployment was gone when its turn came
    Deleted,
    /// Restarted immediately without queueing
    Restarted,
}

/// One queued or in-flight restart of an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueComponent {
    /// Name of the instance (and of its deployment)
    pub cr_name: String,
    /// Joined restart reasons
    pub reason: String,
    /// Where the restart is in its lifecycle
    pub status: ComponentStatus,
    /// Ready pod observed when the restart was issued
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_name: Option<String>,
    /// Last time the pods were checked, or when a console restart happened
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Deadline for a new pod to appear
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_until_at: Option<DateTime<Utc>>,
}

impl QueueComponent {
    /// Freshly queued entry
    pub fn pending(cr_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            cr_name: cr_name.into(),
            reason: reason.into(),
            status: ComponentStatus::Pending,
            pod_name: None,
            last_checked_at: None,
            check_until_at: None,
        }
    }

    /// Log entry for a restart issued without queueing
    pub fn restarted(
        cr_name: impl Into<String>,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            status: ComponentStatus::Restarted,
            last_checked_at: Some(now),
            ..Self::pending(cr_name, reason)
        }
    }
}

/// Queue document for one component type, stored as `<type>-restart-config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartQueueConfig {
    /// Tenant key to FIFO queue; only the head ever progresses
    #[serde(default)]
    pub queues: BTreeMap<String, Vec<QueueComponent>>,
    /// Instance name to every restart that left a queue, oldest first
    #[serde(default)]
    pub log: BTreeMap<String, Vec<QueueComponent>>,
}

impl RestartQueueConfig {
    /// Append `component` to the tail of `tenant`'s queue
    pub fn add_to_queue(&mut self, tenant: &str, component: QueueComponent) {
        self.queues
            .entry(tenant.to_string())
            .or_default()
            .push(component);
    }

    /// Append `component` to its instance log
    pub fn add_to_log(&mut self, component: QueueComponent) {
        self.log
            .entry(component.cr_name.clone())
            .or_default()
            .push(component);
    }

    /// Entry at the head of `tenant`'s queue
    pub fn head(&self, tenant: &str) -> Option<&QueueComponent> {
        self.queues.get(tenant).and_then(|queue| queue.first())
    }

    /// Number of entries across all tenant queues
    pub fn queued_len(&self) -> usize {
        self.queues.values().map(Vec::len).sum()
    }

    fn head_matches(&self, tenant: &str, cr_name: &str, status: ComponentStatus) -> bool {
        self.head(tenant)
            .is_some_and(|head| head.cr_name == cr_name && head.status == status)
    }

    /// Overwrite the head of `tenant`'s queue if it is still the entry that
    /// was observed (`cr_name` in `observed` status).
    pub fn replace_head(
        &mut self,
        tenant: &str,
        observed: ComponentStatus,
        component: QueueComponent,
    ) -> bool {
        if !self.head_matches(tenant, &component.cr_name, observed) {
            return false;
        }
        match self.queues.get_mut(tenant).and_then(|queue| queue.first_mut()) {
            Some(head) => {
                *head = component;
                true
            }
            None => false,
        }
    }

    /// Pop the head of `tenant`'s queue into the log as `component`, if the
    /// head is still the entry that was observed.
    pub fn retire_head(
        &mut self,
        tenant: &str,
        observed: ComponentStatus,
        component: QueueComponent,
    ) -> bool {
        if !self.head_matches(tenant, &component.cr_name, observed) {
            return false;
        }
        if let Some(queue) = self.queues.get_mut(tenant) {
            queue.remove(0);
        }
        self.add_to_log(component);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn re_requesting_keeps_original_timestamp() {
        let mut state = InstanceRestartState::default();
        assert!(state.request(RestartReason::AdminCertUpdate, at(0)));
        assert!(!state.request(RestartReason::AdminCertUpdate, at(3)));

        let request = &state.requests[&RestartReason::AdminCertUpdate];
        assert_eq!(request.requested_at, Some(at(0)));
        assert!(request.is_pending());
    }

    #[test]
    fn request_without_previous_restart_is_eligible() {
        let mut request = RestartRequest::default();
        request.mark_requested(at(0));
        assert!(request.is_eligible(Duration::minutes(10)));
    }

    #[test]
    fn request_inside_wait_window_is_not_eligible() {
        let request = RestartRequest {
            status: RequestStatus::Pending,
            requested_at: Some(at(5)),
            last_action_at: Some(at(0)),
        };
        assert!(!request.is_eligible(Duration::minutes(10)));
        assert!(request.is_eligible(Duration::minutes(5)));
    }

    #[test]
    fn completed_request_is_never_eligible() {
        let request = RestartRequest {
            status: RequestStatus::Complete,
            requested_at: None,
            last_action_at: None,
        };
        assert!(!request.is_eligible(Duration::zero()));
    }

    #[test]
    fn next_trigger_follows_oldest_pending_request() {
        let mut state = InstanceRestartState::default();
        state.requests.insert(
            RestartReason::EcertUpdate,
            RestartRequest {
                status: RequestStatus::Pending,
                requested_at: Some(at(8)),
                last_action_at: Some(at(6)),
            },
        );
        state.requests.insert(
            RestartReason::ConfigOverride,
            RestartRequest {
                status: RequestStatus::Pending,
                requested_at: Some(at(4)),
                last_action_at: Some(at(1)),
            },
        );
        assert_eq!(state.next_trigger_at(Duration::minutes(10)), Some(at(11)));
    }

    #[test]
    fn complete_pending_clears_episode() {
        let mut config = RestartManagerConfig::default();
        config.request("peer1", RestartReason::TlsUpdate, at(0));
        config.request("peer1", RestartReason::AdminCertUpdate, at(1));

        let reasons = config.complete_pending("peer1", at(2));
        assert_eq!(
            reasons,
            vec![RestartReason::AdminCertUpdate, RestartReason::TlsUpdate]
        );

        let state = config.instance("peer1").cloned().unwrap_or_default();
        assert!(!state.has_pending());
        for request in state.requests.values() {
            assert_eq!(request.last_action_at, Some(at(2)));
            assert_eq!(request.requested_at, None);
        }
        assert!(config.complete_pending("peer2", at(2)).is_empty());
    }

    #[test]
    fn reopen_restores_requests_completed_at_that_time() {
        let mut config = RestartManagerConfig::default();
        config.request("peer1", RestartReason::TlsUpdate, at(0));
        let before = config.instance("peer1").cloned().unwrap_or_default().requests;

        config.complete_pending("peer1", at(2));
        assert!(config.reopen("peer1", &before, at(2)));
        assert_eq!(config.instance("peer1").map(|s| &s.requests), Some(&before));

        config.complete_pending("peer1", at(3));
        assert!(!config.reopen("peer1", &before, at(2)));
        assert!(!config.reopen("peer2", &before, at(3)));
    }

    #[test]
    fn retire_head_moves_entry_to_log() {
        let mut queues = RestartQueueConfig::default();
        queues.add_to_queue("org1", QueueComponent::pending("peer1", "tlsUpdate"));
        queues.add_to_queue("org1", QueueComponent::pending("peer2", "tlsUpdate"));

        let mut done = QueueComponent::pending("peer1", "tlsUpdate");
        done.status = ComponentStatus::Completed;
        assert!(queues.retire_head("org1", ComponentStatus::Pending, done.clone()));

        assert_eq!(queues.head("org1").map(|c| c.cr_name.as_str()), Some("peer2"));
        assert_eq!(queues.log["peer1"], vec![done]);
    }

    #[test]
    fn stale_transition_is_ignored() {
        let mut queues = RestartQueueConfig::default();
        queues.add_to_queue("org1", QueueComponent::pending("peer2", "migration"));

        let mut waiting = QueueComponent::pending("peer1", "migration");
        waiting.status = ComponentStatus::Waiting;
        assert!(!queues.replace_head("org1", ComponentStatus::Pending, waiting.clone()));
        assert!(!queues.retire_head("org1", ComponentStatus::Waiting, waiting));
        assert_eq!(queues.queued_len(), 1);
        assert!(queues.log.is_empty());
    }

    #[test]
    fn persisted_shape_uses_camel_case_names() {
        let mut config = RestartManagerConfig::default();
        config.request("peer1", RestartReason::NodeOU, at(0));
        let json = serde_json::to_value(&config).unwrap_or_default();

        let request = &json["instances"]["peer1"]["requests"]["nodeOU"];
        assert_eq!(request["status"], "pending");
        assert!(request.get("requestedAt").is_some());
        assert!(request.get("lastActionAt").is_none());

        let decoded: RestartManagerConfig = serde_json::from_value(json).unwrap_or_default();
        assert_eq!(decoded, config);
    }
}

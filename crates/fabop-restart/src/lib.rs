//! fabop-restart: restart orchestration engine
//!
//! Decides when managed blockchain components are restarted and serializes
//! those restarts per organization.
//!
//! - [`RestartManager`] coalesces restart requests from reconcilers and
//!   debounces them against the last restart for the same reason.
//! - [`StaggerRestartService`] queues restarts per tenant and advances the
//!   head of each queue on every [`reconcile`](StaggerRestartService::reconcile)
//!   pass, detecting completion by pod identity.
//! - [`ConfigStore`] persists both documents in namespaced ConfigMaps with
//!   conflict-retrying read-modify-write.
//!
//! All state lives in ConfigMaps; in-memory timers are recomputed from
//! persisted timestamps and may be lost without losing requests.

#![forbid(unsafe_code)]

pub mod manager;
pub mod stagger;
pub mod store;
pub mod timers;

pub use manager::{RestartManager, TriggerOutcome};
pub use stagger::StaggerRestartService;
pub use store::{
    document_label_selector, ConfigStore, Versioned, DOCUMENT_KEY, DOCUMENT_LABEL,
    DOCUMENT_LABEL_VALUE, MANAGED_BY_LABEL, MANAGED_BY_VALUE, OPERATOR_CONFIG,
};
pub use timers::TimerRegistry;

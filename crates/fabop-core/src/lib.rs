//! fabop-core: types and effect interfaces for restart orchestration
//!
//! This crate holds everything the restart engine and its collaborators share:
//!
//! - [`types`]: managed instances, restart reasons and the two persisted
//!   restart documents, together with the invariant-preserving operations on them
//! - [`effects`]: effect traits for ConfigMaps, deployment restarts, pod
//!   listing, time and randomness
//! - [`config`]: engine configuration
//! - [`reliability`]: bounded retry policies
//!
//! No I/O happens here; handlers live in `fabop-effects` (production) and
//! `fabop-testkit` (tests).

#![forbid(unsafe_code)]

pub mod config;
pub mod effects;
pub mod errors;
pub mod reliability;
pub mod types;

pub use config::RestartConfig;
pub use errors::{FabopError, FabopResult};
pub use reliability::{BackoffStrategy, RetryPolicy};
pub use types::instance::pod_selector;
pub use types::{
    CertKind, ComponentStatus, ComponentType, Instance, InstanceRestartState, QueueComponent,
    RequestStatus, RestartManagerConfig, RestartQueueConfig, RestartReason, RestartRequest,
    DOCUMENT_KEY,
};

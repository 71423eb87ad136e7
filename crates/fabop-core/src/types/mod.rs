//! Domain types shared by the restart engine and its collaborators.

pub mod documents;
pub mod instance;
pub mod reason;

pub use documents::{
    ComponentStatus, InstanceRestartState, QueueComponent, RequestStatus, RestartManagerConfig,
    RestartQueueConfig, RestartRequest, DOCUMENT_KEY,
};
pub use instance::{ComponentType, Instance};
pub use reason::{CertKind, RestartReason};

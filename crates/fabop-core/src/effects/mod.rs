//! Effect trait definitions
//!
//! Pure trait definitions for every side effect the restart engine performs.
//! This module defines **what** effects can be performed; handlers in
//! `fabop-effects` (Kubernetes, system clock) and `fabop-testkit` (in-memory,
//! controllable) define **how**.
//!
//! # Effect Classification
//!
//! - **ConfigMap**: namespaced key-value documents the engine persists its state in
//! - **Deployment**: the idempotent rolling-restart action
//! - **Pod**: ready-pod listing used for restart completion detection
//! - **Time**, **Random**: wall clock, sleeping and jitter
//!
//! [`RestartEffects`] bundles all of them for the engine's services.

pub mod config_map;
pub mod deployment;
pub mod pods;
pub mod random;
pub mod supertraits;
pub mod time;

pub use config_map::{ConfigMapData, ConfigMapEffects, ConfigMapError, ConfigMapWrite};
pub use deployment::{DeploymentEffects, DeploymentError, RESTARTED_AT_ANNOTATION};
pub use pods::{PodEffects, PodError, PodIdentity};
pub use random::RandomEffects;
pub use supertraits::RestartEffects;
pub use time::PhysicalTimeEffects;

//! Production effect handlers
//!
//! Stateless implementations of the effect traits defined in `fabop-core`:
//!
//! - [`RealTimeHandler`]: system clock and tokio sleeping
//! - [`RealRandomHandler`]: thread-local RNG
//! - [`k8s`]: ConfigMap, Deployment and Pod handlers over a `kube::Client`
//! - [`KubeEffects`]: all of the above behind one value, satisfying
//!   `fabop_core::effects::RestartEffects`
//!
//! **Constraint**: no mock handlers here; in-memory handlers belong in
//! `fabop-testkit`.

#![forbid(unsafe_code)]

pub mod composite;
pub mod k8s;
pub mod random;
pub mod time;

pub use composite::KubeEffects;
pub use k8s::{KubeConfigMapHandler, KubeDeploymentHandler, KubePodHandler};
pub use random::RealRandomHandler;
pub use time::RealTimeHandler;

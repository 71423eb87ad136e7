//! fabop Testing Infrastructure
//!
//! Stateful in-memory effect handlers and fixtures for exercising the
//! restart engine without a cluster.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! fabop-testkit = { path = "../fabop-testkit" }
//! ```
//!
//! ```rust,no_run
//! use fabop_testkit::*;
//!
//! # async fn demo() {
//! let effects = TestEffects::new();
//! effects.pods.set_ready_pods("peer1", TEST_NAMESPACE, &["peer1-abc"]);
//! effects.clock.advance(minutes(5));
//! # }
//! ```

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

pub mod config_maps;
pub mod deployments;
pub mod effects;
pub mod fixtures;
pub mod pods;
pub mod random;
pub mod time;

pub use config_maps::MemoryConfigMapHandler;
pub use deployments::RecordingDeploymentHandler;
pub use effects::TestEffects;
pub use fixtures::*;
pub use pods::ScriptedPodHandler;
pub use random::SeededRandomHandler;
pub use time::ControllableClock;

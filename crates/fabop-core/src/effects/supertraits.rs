//! Supertraits for common effect combinations

use super::{ConfigMapEffects, DeploymentEffects, PhysicalTimeEffects, PodEffects, RandomEffects};

/// Everything the restart engine touches: persisted documents, the restart
/// action, pod listing, the clock and jitter.
pub trait RestartEffects:
    ConfigMapEffects + DeploymentEffects + PodEffects + PhysicalTimeEffects + RandomEffects
{
}

/// Automatic implementation for types that satisfy the required bounds
impl<T> RestartEffects for T where
    T: ConfigMapEffects + DeploymentEffects + PodEffects + PhysicalTimeEffects + RandomEffects
{
}

//! Managed instances and component types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::FabopError;

/// Suffix of the per component type queue document name.
const RESTART_CONFIG_SUFFIX: &str = "-restart-config";

/// Kind of a managed network component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    /// Certificate authority
    Ca,
    /// Peer node
    Peer,
    /// Ordering node
    Orderer,
    /// Single instance per network, restarted without queueing
    Console,
}

impl ComponentType {
    /// Every component type with a restart document
    pub const ALL: [ComponentType; 4] = [
        ComponentType::Ca,
        ComponentType::Peer,
        ComponentType::Orderer,
        ComponentType::Console,
    ];

    /// Lowercase name, as used in document names
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::Ca => "ca",
            ComponentType::Peer => "peer",
            ComponentType::Orderer => "orderer",
            ComponentType::Console => "console",
        }
    }

    /// True when restarts of this type go through a tenant queue
    pub fn is_staggered(&self) -> bool {
        !matches!(self, ComponentType::Console)
    }

    /// Name of the ConfigMap holding this type's restart queues
    pub fn restart_config_name(&self) -> String {
        format!("{}{RESTART_CONFIG_SUFFIX}", self.as_str())
    }

    /// Inverse of [`ComponentType::restart_config_name`]
    pub fn from_restart_config_name(name: &str) -> Option<Self> {
        name.strip_suffix(RESTART_CONFIG_SUFFIX)
            .and_then(|prefix| prefix.parse().ok())
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = FabopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ca" => Ok(ComponentType::Ca),
            "peer" => Ok(ComponentType::Peer),
            "orderer" => Ok(ComponentType::Orderer),
            "console" => Ok(ComponentType::Console),
            other => Err(FabopError::invalid(format!(
                "unknown component type '{other}'"
            ))),
        }
    }
}

/// A managed component as seen by the restart engine.
///
/// The restart action for an instance targets the deployment carrying the
/// instance's name, and its pods are selected by `app=<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instance {
    name: String,
    namespace: String,
    /// Organization (MSP) id; restarts within one tenant are serialized
    tenant: String,
    kind: ComponentType,
}

impl Instance {
    /// Instance of any kind
    pub fn new(
        kind: ComponentType,
        name: impl Into<String>,
        namespace: impl Into<String>,
        tenant: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            tenant: tenant.into(),
            kind,
        }
    }

    /// Certificate authority instance
    pub fn ca(
        name: impl Into<String>,
        namespace: impl Into<String>,
        tenant: impl Into<String>,
    ) -> Self {
        Self::new(ComponentType::Ca, name, namespace, tenant)
    }

    /// Peer instance
    pub fn peer(
        name: impl Into<String>,
        namespace: impl Into<String>,
        tenant: impl Into<String>,
    ) -> Self {
        Self::new(ComponentType::Peer, name, namespace, tenant)
    }

    /// Orderer instance
    pub fn orderer(
        name: impl Into<String>,
        namespace: impl Into<String>,
        tenant: impl Into<String>,
    ) -> Self {
        Self::new(ComponentType::Orderer, name, namespace, tenant)
    }

    /// Console instance; consoles have no tenant
    pub fn console(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::new(ComponentType::Console, name, namespace, "")
    }

    /// Instance (custom resource) name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace of the instance
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key of the tenant queue this instance restarts through
    pub fn tenant_key(&self) -> &str {
        &self.tenant
    }

    /// Component type
    pub fn kind(&self) -> ComponentType {
        self.kind
    }

    /// Deployment restarted for this instance
    pub fn deployment_name(&self) -> &str {
        &self.name
    }

    /// `namespace/name`, unique across the cluster
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Label selector for the pods of the deployment named `cr_name`
pub fn pod_selector(cr_name: &str) -> String {
    format!("app={cr_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_config_name_round_trips() {
        for kind in ComponentType::ALL {
            let name = kind.restart_config_name();
            assert_eq!(ComponentType::from_restart_config_name(&name), Some(kind));
        }
        assert_eq!(ComponentType::from_restart_config_name("operator-config"), None);
        assert_eq!(ComponentType::from_restart_config_name("nginx-restart-config"), None);
    }

    #[test]
    fn console_is_not_staggered() {
        assert!(!ComponentType::Console.is_staggered());
        let staggered = ComponentType::ALL.iter().filter(|kind| kind.is_staggered());
        assert_eq!(staggered.count(), 3);
    }

    #[test]
    fn instance_accessors() {
        let peer = Instance::peer("peer1", "fabric", "org1msp");
        assert_eq!(peer.key(), "fabric/peer1");
        assert_eq!(peer.tenant_key(), "org1msp");
        assert_eq!(pod_selector(peer.name()), "app=peer1");
        assert_eq!(peer.deployment_name(), "peer1");
        assert_eq!(peer.kind(), ComponentType::Peer);
    }
}

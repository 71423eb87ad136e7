//! Restart reasons

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::FabopError;

/// Closed set of causes a reconciler may record for restarting an instance.
///
/// Ordering follows declaration order; joined reason strings are built in this
/// order so the same pending set always produces the same string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RestartReason {
    /// An admin certificate changed
    #[serde(rename = "adminCertUpdate")]
    AdminCertUpdate,
    /// The enrollment certificate was renewed
    #[serde(rename = "ecertUpdate")]
    EcertUpdate,
    /// The TLS certificate was renewed
    #[serde(rename = "tlsUpdate")]
    TlsUpdate,
    /// The config override changed
    #[serde(rename = "configOverride")]
    ConfigOverride,
    /// A version migration ran
    #[serde(rename = "migration")]
    Migration,
    /// NodeOU support was toggled
    #[serde(rename = "nodeOU")]
    NodeOU,
    /// A mounted ConfigMap changed
    #[serde(rename = "configMapUpdate")]
    ConfigMapUpdate,
    /// Restart explicitly requested on the custom resource
    #[serde(rename = "restartAction")]
    RestartAction,
}

impl RestartReason {
    /// Every reason, in declaration order
    pub const ALL: [RestartReason; 8] = [
        RestartReason::AdminCertUpdate,
        RestartReason::EcertUpdate,
        RestartReason::TlsUpdate,
        RestartReason::ConfigOverride,
        RestartReason::Migration,
        RestartReason::NodeOU,
        RestartReason::ConfigMapUpdate,
        RestartReason::RestartAction,
    ];

    /// Persisted name of the reason
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartReason::AdminCertUpdate => "adminCertUpdate",
            RestartReason::EcertUpdate => "ecertUpdate",
            RestartReason::TlsUpdate => "tlsUpdate",
            RestartReason::ConfigOverride => "configOverride",
            RestartReason::Migration => "migration",
            RestartReason::NodeOU => "nodeOU",
            RestartReason::ConfigMapUpdate => "configMapUpdate",
            RestartReason::RestartAction => "restartAction",
        }
    }

    /// Join reasons into the comma separated form recorded on queue entries
    pub fn join(reasons: &[RestartReason]) -> String {
        reasons
            .iter()
            .map(RestartReason::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for RestartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestartReason {
    type Err = FabopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RestartReason::ALL
            .into_iter()
            .find(|reason| reason.as_str() == s)
            .ok_or_else(|| FabopError::invalid(format!("unknown restart reason '{s}'")))
    }
}

/// Certificate kinds whose renewal requires a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertKind {
    /// Enrollment certificate
    Ecert,
    /// TLS certificate
    Tls,
}

impl From<CertKind> for RestartReason {
    fn from(kind: CertKind) -> Self {
        match kind {
            CertKind::Ecert => RestartReason::EcertUpdate,
            CertKind::Tls => RestartReason::TlsUpdate,
        }
    }
}

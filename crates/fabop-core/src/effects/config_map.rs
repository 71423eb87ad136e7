//! ConfigMap effects
//!
//! Namespaced string-keyed documents with an opaque resource version. Writes
//! may carry the version they were derived from; a handler must reject such a
//! write with [`ConfigMapError::Conflict`] when the stored version differs.

use async_trait::async_trait;
use std::collections::BTreeMap;

/// Error type for ConfigMap operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigMapError {
    /// Stored version differs from the one the write was derived from
    #[error("configmap {namespace}/{name} was modified concurrently")]
    Conflict {
        /// ConfigMap name
        name: String,
        /// ConfigMap namespace
        namespace: String,
    },
    /// Any other API failure
    #[error("configmap {namespace}/{name}: {message}")]
    Api {
        /// ConfigMap name
        name: String,
        /// ConfigMap namespace
        namespace: String,
        /// API error message
        message: String,
    },
}

/// Stored contents of a ConfigMap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMapData {
    /// Data keys to values
    pub data: BTreeMap<String, String>,
    /// Version observed at read time, passed back on conditional writes
    pub resource_version: Option<String>,
}

/// Create-or-replace request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigMapWrite {
    /// ConfigMap name
    pub name: String,
    /// ConfigMap namespace
    pub namespace: String,
    /// Labels set on the ConfigMap
    pub labels: BTreeMap<String, String>,
    /// Full data to store
    pub data: BTreeMap<String, String>,
    /// `None` creates the ConfigMap; `Some` replaces it only if the stored
    /// version still matches
    pub resource_version: Option<String>,
}

/// Versioned ConfigMap reads and conditional writes
#[async_trait]
pub trait ConfigMapEffects: Send + Sync {
    /// Fetch a ConfigMap; `Ok(None)` when it does not exist.
    async fn get_config_map(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<ConfigMapData>, ConfigMapError>;

    /// Create or replace a ConfigMap, returning the new resource version.
    async fn put_config_map(&self, write: ConfigMapWrite) -> Result<String, ConfigMapError>;
}

/// Blanket implementation for Arc<T> where T: ConfigMapEffects
#[async_trait]
impl<T: ConfigMapEffects + ?Sized> ConfigMapEffects for std::sync::Arc<T> {
    async fn get_config_map(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<ConfigMapData>, ConfigMapError> {
        (**self).get_config_map(name, namespace).await
    }

    async fn put_config_map(&self, write: ConfigMapWrite) -> Result<String, ConfigMapError> {
        (**self).put_config_map(write).await
    }
}

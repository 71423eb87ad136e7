//! Config Store
//!
//! Generic persistence adapter: marshals a configuration structure to and from
//! a single data key of a namespaced ConfigMap.
//!
//! - A missing ConfigMap (or missing key) loads as `T::default()`, never an error.
//! - Writes are conditional on the resource version observed at load time.
//! - [`ConfigStore::update`] wraps load, mutate and save in a loop that
//!   retries on conflicts, so concurrent writers never silently drop each
//!   other's changes.

use fabop_core::effects::{ConfigMapEffects, ConfigMapWrite, PhysicalTimeEffects};
use fabop_core::{FabopError, FabopResult, RetryPolicy};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub use fabop_core::DOCUMENT_KEY;

/// ConfigMap holding the namespace's restart requests
pub const OPERATOR_CONFIG: &str = "operator-config";

/// Label marking ConfigMaps written by the store
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";
/// Value of [`MANAGED_BY_LABEL`] on store-written ConfigMaps
pub const MANAGED_BY_VALUE: &str = "fabop";

/// Label identifying restart documents, watched by the agent
pub const DOCUMENT_LABEL: &str = "fabop.io/document";
/// Value of [`DOCUMENT_LABEL`] on restart documents
pub const DOCUMENT_LABEL_VALUE: &str = "restart-config";

/// Selector matching every ConfigMap the store writes
pub fn document_label_selector() -> String {
    format!("{DOCUMENT_LABEL}={DOCUMENT_LABEL_VALUE}")
}

/// A loaded document and the resource version it was read at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Versioned<T> {
    /// Decoded document, default when missing
    pub value: T,
    /// `None` when the ConfigMap did not exist
    pub resource_version: Option<String>,
}

/// ConfigMap-backed document store
pub struct ConfigStore<E> {
    effects: Arc<E>,
    retry: RetryPolicy,
}

impl<E> Clone for ConfigStore<E> {
    fn clone(&self) -> Self {
        Self {
            effects: Arc::clone(&self.effects),
            retry: self.retry.clone(),
        }
    }
}

impl<E> ConfigStore<E>
where
    E: ConfigMapEffects + PhysicalTimeEffects,
{
    /// Store over `effects`, retrying write conflicts under `retry`
    pub fn new(effects: Arc<E>, retry: RetryPolicy) -> Self {
        Self { effects, retry }
    }

    /// Read and decode document `name`; absent documents decode as default.
    pub async fn load<T>(&self, name: &str, namespace: &str) -> FabopResult<Versioned<T>>
    where
        T: DeserializeOwned + Default,
    {
        let stored = self
            .effects
            .get_config_map(name, namespace)
            .await
            .map_err(|e| FabopError::from(e).context(format!("loading {name}")))?;

        let Some(stored) = stored else {
            debug!(document = name, namespace, "document not found, using defaults");
            return Ok(Versioned::default());
        };

        let value = match stored.data.get(DOCUMENT_KEY) {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw).map_err(|e| {
                FabopError::from(e).context(format!("decoding {name}/{DOCUMENT_KEY}"))
            })?,
            _ => T::default(),
        };

        Ok(Versioned {
            value,
            resource_version: stored.resource_version,
        })
    }

    /// Encode and write `document`, conditional on its resource version.
    /// Returns the new resource version.
    pub async fn save<T>(
        &self,
        name: &str,
        namespace: &str,
        document: &Versioned<T>,
    ) -> FabopResult<String>
    where
        T: Serialize,
    {
        let raw = serde_json::to_string(&document.value)
            .map_err(|e| FabopError::from(e).context(format!("encoding {name}")))?;

        let write = ConfigMapWrite {
            name: name.to_string(),
            namespace: namespace.to_string(),
            labels: BTreeMap::from([
                (MANAGED_BY_LABEL.to_string(), MANAGED_BY_VALUE.to_string()),
                (DOCUMENT_LABEL.to_string(), DOCUMENT_LABEL_VALUE.to_string()),
            ]),
            data: BTreeMap::from([(DOCUMENT_KEY.to_string(), raw)]),
            resource_version: document.resource_version.clone(),
        };

        self.effects
            .put_config_map(write)
            .await
            .map_err(|e| FabopError::from(e).context(format!("saving {name}")))
    }

    /// Read-modify-write `name`. `mutate` reports whether it changed the
    /// document; unchanged documents are not written. Conflicting writes
    /// reload and re-run `mutate` within the store's retry policy.
    ///
    /// Returns whether a write happened.
    pub async fn update<T, F>(
        &self,
        name: &str,
        namespace: &str,
        mut mutate: F,
    ) -> FabopResult<bool>
    where
        T: Serialize + DeserializeOwned + Default + Send,
        F: FnMut(&mut T) -> bool + Send,
    {
        let mut attempt = 0;
        loop {
            let mut document = self.load::<T>(name, namespace).await?;
            if !mutate(&mut document.value) {
                return Ok(false);
            }

            match self.save(name, namespace, &document).await {
                Ok(_) => return Ok(true),
                Err(err) if err.is_conflict() && self.retry.allows_retry(attempt) => {
                    let delay = self.retry.calculate_delay(attempt);
                    warn!(
                        document = name,
                        namespace,
                        attempt,
                        "concurrent write detected, reloading"
                    );
                    self.effects
                        .sleep_ms(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
                        .await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

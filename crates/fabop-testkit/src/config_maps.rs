//! Versioned in-memory ConfigMap store
//!
//! Mirrors the API server's optimistic concurrency: every write bumps a
//! monotonically increasing resource version, creates fail when the map
//! already exists and replaces fail when the caller's version is stale.

use async_trait::async_trait;
use fabop_core::effects::{ConfigMapData, ConfigMapEffects, ConfigMapError, ConfigMapWrite};
use fabop_core::DOCUMENT_KEY;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

type Key = (String, String);

#[derive(Debug, Clone)]
struct StoredMap {
    labels: BTreeMap<String, String>,
    data: BTreeMap<String, String>,
    version: u64,
}

/// Write performed by another party just before one of ours lands
type ConcurrentWrite = Box<dyn FnOnce(&mut BTreeMap<String, String>) + Send>;

#[derive(Default)]
struct State {
    maps: HashMap<Key, StoredMap>,
    next_version: u64,
    writes: usize,
    injected_conflicts: u32,
    injected_failures: u32,
    concurrent: VecDeque<(Key, ConcurrentWrite)>,
}

impl State {
    fn bump(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    fn store(
        &mut self,
        key: Key,
        labels: BTreeMap<String, String>,
        data: BTreeMap<String, String>,
    ) -> u64 {
        let version = self.bump();
        self.maps.insert(
            key,
            StoredMap {
                labels,
                data,
                version,
            },
        );
        version
    }

    fn run_concurrent_writes(&mut self, target: &Key) {
        let mut remaining = VecDeque::new();
        while let Some((key, write)) = self.concurrent.pop_front() {
            if &key != target {
                remaining.push_back((key, write));
                continue;
            }
            let version = self.bump();
            let stored = self.maps.entry(key).or_insert_with(|| StoredMap {
                labels: BTreeMap::new(),
                data: BTreeMap::new(),
                version,
            });
            write(&mut stored.data);
            stored.version = version;
        }
        self.concurrent = remaining;
    }
}

/// ConfigMap handler backed by a shared in-memory map
#[derive(Clone, Default)]
pub struct MemoryConfigMapHandler {
    state: Arc<Mutex<State>>,
}

impl MemoryConfigMapHandler {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` writes with a conflict
    pub fn inject_conflicts(&self, count: u32) {
        self.state.lock().injected_conflicts = count;
    }

    /// Fail the next `count` writes with an API error
    pub fn inject_failures(&self, count: u32) {
        self.state.lock().injected_failures = count;
    }

    /// Apply `mutate` to document `name` right before the next write to it,
    /// as if another writer got there first.
    pub fn concurrent_update<T, F>(&self, name: &str, namespace: &str, mutate: F)
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) + Send + 'static,
    {
        let write: ConcurrentWrite = Box::new(move |data| {
            let mut document: T = data
                .get(DOCUMENT_KEY)
                .and_then(|raw| serde_json::from_str(raw).ok())
                .unwrap_or_default();
            mutate(&mut document);
            if let Ok(raw) = serde_json::to_string(&document) {
                data.insert(DOCUMENT_KEY.to_string(), raw);
            }
        });
        self.state
            .lock()
            .concurrent
            .push_back(((namespace.to_string(), name.to_string()), write));
    }

    /// Store a raw data value, bypassing serialization
    pub fn insert_raw(&self, name: &str, namespace: &str, key: &str, raw: &str) {
        let mut state = self.state.lock();
        let map_key = (namespace.to_string(), name.to_string());
        let (labels, mut data) = state
            .maps
            .get(&map_key)
            .map(|stored| (stored.labels.clone(), stored.data.clone()))
            .unwrap_or_default();
        data.insert(key.to_string(), raw.to_string());
        state.store(map_key, labels, data);
    }

    /// Seed a document as if it had been written by the engine
    pub fn insert_document<T: Serialize>(&self, name: &str, namespace: &str, document: &T) {
        if let Ok(raw) = serde_json::to_string(document) {
            self.insert_raw(name, namespace, DOCUMENT_KEY, &raw);
        }
    }

    /// Decoded document `name`, if present and well-formed
    pub fn document<T: DeserializeOwned>(&self, name: &str, namespace: &str) -> Option<T> {
        let state = self.state.lock();
        let stored = state
            .maps
            .get(&(namespace.to_string(), name.to_string()))?;
        serde_json::from_str(stored.data.get(DOCUMENT_KEY)?).ok()
    }

    /// Labels of ConfigMap `name`, empty when absent
    pub fn labels(&self, name: &str, namespace: &str) -> BTreeMap<String, String> {
        self.state
            .lock()
            .maps
            .get(&(namespace.to_string(), name.to_string()))
            .map(|stored| stored.labels.clone())
            .unwrap_or_default()
    }

    /// True if ConfigMap `name` exists
    pub fn contains(&self, name: &str, namespace: &str) -> bool {
        self.state
            .lock()
            .maps
            .contains_key(&(namespace.to_string(), name.to_string()))
    }

    /// Number of successful writes through [`ConfigMapEffects::put_config_map`]
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }
}

#[async_trait]
impl ConfigMapEffects for MemoryConfigMapHandler {
    async fn get_config_map(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<ConfigMapData>, ConfigMapError> {
        let state = self.state.lock();
        Ok(state
            .maps
            .get(&(namespace.to_string(), name.to_string()))
            .map(|stored| ConfigMapData {
                data: stored.data.clone(),
                resource_version: Some(stored.version.to_string()),
            }))
    }

    async fn put_config_map(&self, write: ConfigMapWrite) -> Result<String, ConfigMapError> {
        let mut state = self.state.lock();
        let key = (write.namespace.clone(), write.name.clone());
        state.run_concurrent_writes(&key);

        if state.injected_failures > 0 {
            state.injected_failures -= 1;
            return Err(ConfigMapError::Api {
                name: write.name,
                namespace: write.namespace,
                message: "injected failure".to_string(),
            });
        }

        let conflict = ConfigMapError::Conflict {
            name: write.name.clone(),
            namespace: write.namespace.clone(),
        };
        if state.injected_conflicts > 0 {
            state.injected_conflicts -= 1;
            return Err(conflict);
        }

        let current = state.maps.get(&key).map(|stored| stored.version.to_string());
        match (&write.resource_version, &current) {
            (None, None) => {}
            (Some(expected), Some(current)) if expected == current => {}
            _ => return Err(conflict),
        }

        state.writes += 1;
        let version = state.store(key, write.labels, write.data);
        Ok(version.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(version: Option<String>) -> ConfigMapWrite {
        ConfigMapWrite {
            name: "operator-config".to_string(),
            namespace: "ns1".to_string(),
            labels: BTreeMap::new(),
            data: BTreeMap::from([(DOCUMENT_KEY.to_string(), "{}".to_string())]),
            resource_version: version,
        }
    }

    #[tokio::test]
    async fn create_then_stale_replace_conflicts() {
        let handler = MemoryConfigMapHandler::new();
        let v1 = handler.put_config_map(write(None)).await.unwrap();
        assert!(handler.put_config_map(write(None)).await.is_err());

        let v2 = handler.put_config_map(write(Some(v1.clone()))).await.unwrap();
        assert_ne!(v1, v2);
        assert_eq!(
            handler.put_config_map(write(Some(v1))).await,
            Err(ConfigMapError::Conflict {
                name: "operator-config".to_string(),
                namespace: "ns1".to_string(),
            })
        );
        assert_eq!(handler.write_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_update_invalidates_loaded_version() {
        let handler = MemoryConfigMapHandler::new();
        let v1 = handler.put_config_map(write(None)).await.unwrap();
        handler.concurrent_update("operator-config", "ns1", |doc: &mut BTreeMap<String, u32>| {
            doc.insert("other".to_string(), 1);
        });

        assert!(handler.put_config_map(write(Some(v1))).await.is_err());
        let doc: BTreeMap<String, u32> = handler.document("operator-config", "ns1").unwrap();
        assert_eq!(doc.get("other"), Some(&1));
    }
}

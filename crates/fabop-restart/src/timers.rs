//! Deferred trigger registry
//!
//! At most one live one-shot task per instance key. The registry is a cache
//! over persisted state: a lost timer (process restart) is re-armed from the
//! request document's timestamps on the next trigger check.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

struct Entry {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Inner {
    next_generation: u64,
    entries: HashMap<String, Entry>,
}

/// Instance key to pending timer task
#[derive(Clone, Default)]
pub struct TimerRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl TimerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` under `key` unless a timer for `key` is still pending.
    /// Returns whether a new timer was armed.
    pub fn arm<F>(&self, key: &str, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut inner = self.inner.lock();
        if inner
            .entries
            .get(key)
            .is_some_and(|entry| !entry.handle.is_finished())
        {
            return false;
        }

        inner.next_generation += 1;
        let generation = inner.next_generation;
        let registry = self.clone();
        let owned_key = key.to_string();
        let handle = tokio::spawn(async move {
            task.await;
            registry.release(&owned_key, generation);
        });
        inner
            .entries
            .insert(key.to_string(), Entry { generation, handle });
        true
    }

    /// True while the timer under `key` has not fired
    pub fn is_armed(&self, key: &str) -> bool {
        self.inner
            .lock()
            .entries
            .get(key)
            .is_some_and(|entry| !entry.handle.is_finished())
    }

    /// Number of timers that have not fired yet
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .entries
            .values()
            .filter(|entry| !entry.handle.is_finished())
            .count()
    }

    /// True when no timer is pending
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abort every pending timer
    pub fn cancel_all(&self) {
        let mut inner = self.inner.lock();
        for (_, entry) in inner.entries.drain() {
            entry.handle.abort();
        }
    }

    fn release(&self, key: &str, generation: u64) {
        let mut inner = self.inner.lock();
        if inner
            .entries
            .get(key)
            .is_some_and(|entry| entry.generation == generation)
        {
            inner.entries.remove(key);
        }
    }
}

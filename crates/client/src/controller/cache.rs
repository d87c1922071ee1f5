//! In-memory memoization table for successful JSON responses.
//!
//! Keyed by the raw URL string. No TTL and no size bound: entries live until
//! a refetch for the same key evicts them or the owning controller is
//! dropped. Binary payloads are never stored here.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Shared memoization table, cloned into every observation of a controller.
#[derive(Clone, Default)]
pub struct CacheStore {
    entries: Arc<RwLock<HashMap<String, Arc<serde_json::Value>>>>,
}

impl CacheStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the memoized payload for a key.
    pub fn get(&self, key: &str) -> Option<Arc<serde_json::Value>> {
        self.entries.read().expect("cache lock poisoned").get(key).map(Arc::clone)
    }

    /// Memoize a successful JSON payload.
    pub fn insert(&self, key: &str, value: Arc<serde_json::Value>) {
        self.entries.write().expect("cache lock poisoned").insert(key.to_string(), value);
    }

    /// Evict the entry for a key, returning it if present.
    pub fn remove(&self, key: &str) -> Option<Arc<serde_json::Value>> {
        self.entries.write().expect("cache lock poisoned").remove(key)
    }

    /// Whether the store holds an entry for a key.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().expect("cache lock poisoned").contains_key(key)
    }

    /// Number of memoized entries.
    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_get_share_allocation() {
        let store = CacheStore::new();
        let value = Arc::new(json!([1, 2, 3]));
        store.insert("/todos", Arc::clone(&value));

        let hit = store.get("/todos").unwrap();
        assert!(Arc::ptr_eq(&hit, &value));
    }

    #[test]
    fn test_remove_returns_evicted_entry() {
        let store = CacheStore::new();
        store.insert("/todos", Arc::new(json!(1)));

        let evicted = store.remove("/todos");
        assert!(evicted.is_some());
        assert!(!store.contains("/todos"));
        assert!(store.remove("/todos").is_none());
    }

    #[test]
    fn test_clones_share_entries() {
        let store = CacheStore::new();
        let clone = store.clone();
        store.insert("/a", Arc::new(json!("x")));

        assert!(clone.contains("/a"));
        clone.remove("/a");
        assert!(store.is_empty());
    }
}

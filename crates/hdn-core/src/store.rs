//! Pluggable persisted key/value store backing the registry, workflow, and
//! metrics state described by the external interfaces' "persisted state
//! layout" (tool:{id}, workflow:{id}, workflow_mapping:*, active_workflows,
//! metrics:*).
//!
//! The default implementation is an in-process map; a Redis-backed impl
//! would implement the same trait against the same key names.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value);
    async fn delete(&self, key: &str) -> bool;
    /// All keys starting with `prefix`.
    async fn keys_with_prefix(&self, prefix: &str) -> Vec<String>;
    /// Add a member to a set stored at `key`.
    async fn set_add(&self, key: &str, member: &str);
    async fn set_remove(&self, key: &str, member: &str);
    async fn set_members(&self, key: &str) -> Vec<String>;
    /// Atomic increment of a counter stored at `key`, returns the new value.
    async fn incr(&self, key: &str, by: i64) -> i64;
}

#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
    sets: RwLock<HashMap<String, std::collections::BTreeSet<String>>>,
    counters: RwLock<HashMap<String, i64>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    async fn set(&self, key: &str, value: Value) {
        self.values.write().insert(key.to_string(), value);
    }

    async fn delete(&self, key: &str) -> bool {
        self.values.write().remove(key).is_some()
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.values
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    async fn set_add(&self, key: &str, member: &str) {
        self.sets
            .write()
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
    }

    async fn set_remove(&self, key: &str, member: &str) {
        if let Some(s) = self.sets.write().get_mut(key) {
            s.remove(member);
        }
    }

    async fn set_members(&self, key: &str) -> Vec<String> {
        self.sets
            .read()
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn incr(&self, key: &str, by: i64) -> i64 {
        let mut counters = self.counters.write();
        let entry = counters.entry(key.to_string()).or_insert(0);
        *entry += by;
        *entry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_and_get_roundtrip() {
        let store = MemoryStore::new();
        store.set("tool:x", Value::String("hi".into())).await;
        assert_eq!(store.get("tool:x").await, Some(Value::String("hi".into())));
        assert!(store.delete("tool:x").await);
        assert_eq!(store.get("tool:x").await, None);
    }

    #[tokio::test]
    async fn set_members_tracks_membership() {
        let store = MemoryStore::new();
        store.set_add("tools:registry", "a").await;
        store.set_add("tools:registry", "b").await;
        store.set_remove("tools:registry", "a").await;
        assert_eq!(store.set_members("tools:registry").await, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn incr_accumulates() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("metrics:total_executions", 1).await, 1);
        assert_eq!(store.incr("metrics:total_executions", 1).await, 2);
    }
}

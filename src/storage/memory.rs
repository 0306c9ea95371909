//! In-Memory Key-Value Store
//!
//! Information Hiding:
//! - HashMap storage structure hidden from users
//! - Thread-safe access via RwLock hidden behind async interface
//! - Expired entries are evicted lazily on access
//! - Suitable for testing and single-process deployments

use super::{KeyTtl, KeyValueStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    deadline: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.deadline.map_or(true, |deadline| deadline > now)
    }
}

/// In-memory store using HashMap
/// Data is lost when process terminates
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove `key` only if it is still dead at `now`; a value written
    /// after the expiry was observed survives.
    async fn evict_expired(&self, key: &str, now: Instant) -> bool {
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.remove(key);
            tracing::debug!("[MemoryStore] Evicted expired key '{}'", key);
            return true;
        }
        false
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        if self.evict_expired(key, now).await {
            return Ok(None);
        }
        // Rewritten between the read and the eviction
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        let deadline = ttl.map(|ttl| Instant::now() + ttl);
        self.entries.write().await.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                deadline,
            },
        );
        tracing::debug!("[MemoryStore] Set '{}' (ttl {:?})", key, ttl);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let removed = self.entries.write().await.remove(key);
        Ok(removed.is_some_and(|entry| entry.is_live(now)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.deadline = Some(now + ttl);
                Ok(true)
            }
            Some(_) => {
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(match entries.get(key) {
            Some(entry) if entry.is_live(now) => match entry.deadline {
                Some(deadline) => KeyTtl::Expires(deadline - now),
                None => KeyTtl::Persistent,
            },
            _ => KeyTtl::Missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{get_json, set_json};

    #[tokio::test]
    async fn test_set_and_get() {
        let store = MemoryStore::new();
        assert!(store.set("inst:1", "hello", None).await.unwrap());
        assert_eq!(store.get("inst:1").await.unwrap().as_deref(), Some("hello"));
        assert!(store.exists("inst:1").await.unwrap());
        assert_eq!(store.ttl("inst:1").await.unwrap(), KeyTtl::Persistent);
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = MemoryStore::new();
        assert!(store.get("nonexistent").await.unwrap().is_none());
        assert_eq!(store.ttl("nonexistent").await.unwrap(), KeyTtl::Missing);
        assert!(!store.expire("nonexistent", Duration::from_secs(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        store.set("k", "v", None).await.unwrap();
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let store = MemoryStore::new();
        store
            .set("short", "lived", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(matches!(store.ttl("short").await.unwrap(), KeyTtl::Expires(_)));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(store.get("short").await.unwrap().is_none());
        assert_eq!(store.ttl("short").await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test]
    async fn test_eviction_spares_value_rewritten_after_expiry_check() {
        let store = MemoryStore::new();
        store
            .set("inst:1", "stale", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        // get observed the stale entry at `checked_at`, then a writer won the lock
        let checked_at = Instant::now();
        assert!(store.set("inst:1", "fresh", Some(Duration::from_secs(60))).await.unwrap());
        assert!(!store.evict_expired("inst:1", checked_at).await);
        assert_eq!(store.get("inst:1").await.unwrap().as_deref(), Some("fresh"));

        store.set("inst:2", "stale", Some(Duration::from_millis(10))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.evict_expired("inst:2", Instant::now()).await);
        assert_eq!(store.ttl("inst:2").await.unwrap(), KeyTtl::Missing);
    }

    #[tokio::test]
    async fn test_expire_extends_lifetime() {
        let store = MemoryStore::new();
        store
            .set("k", "v", Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(store.expire("k", Duration::from_secs(60)).await.unwrap());

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryStore::new();
        let ids = vec!["c1".to_string(), "c2".to_string()];
        set_json(&store, "comments_1", &ids, None).await.unwrap();

        let loaded: Option<Vec<String>> = get_json(&store, "comments_1").await.unwrap();
        assert_eq!(loaded, Some(ids));

        store.set("broken", "{", None).await.unwrap();
        let err = get_json::<Vec<String>>(&store, "broken").await.unwrap_err();
        assert!(matches!(err, crate::error::Error::CorruptContext { .. }));
    }
}

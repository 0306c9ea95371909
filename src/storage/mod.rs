//! Key-Value Store Abstraction
//!
//! Information Hiding:
//! - Backend protocol (Redis, in-process map) hidden behind trait
//! - Expiry bookkeeping belongs to each backend
//! - Callers only see string keys, string values and whole-second TTLs

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub mod memory;
pub mod redis;

pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

/// Remaining lifetime of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    Missing,
    Persistent,
    Expires(Duration),
}

/// Every call either lands or fails with `Error::StoreUnavailable`
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite `key`; `None` ttl stores without expiry
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool>;

    async fn delete(&self, key: &str) -> Result<bool>;

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// Reset the expiry of an existing key; false when the key is absent
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    async fn ttl(&self, key: &str) -> Result<KeyTtl>;
}

/// Load and decode a JSON value
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| Error::corrupt(key, e)),
        None => Ok(None),
    }
}

/// Encode and store a JSON value
pub async fn set_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> Result<bool> {
    let raw = serde_json::to_string(value)
        .map_err(|e| Error::InvalidInput(format!("value for '{}' not serializable: {}", key, e)))?;
    store.set(key, &raw, ttl).await
}

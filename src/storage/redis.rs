//! Redis Key-Value Store
//!
//! Information Hiding:
//! - Connection management (reconnects) hidden behind ConnectionManager
//! - Every command bounded by a timeout; slow or lost connections surface
//!   as `StoreUnavailable` instead of hanging a request

use super::{KeyTtl, KeyValueStore};
use crate::error::{Error, Result};
use ::redis::aio::ConnectionManager;
use ::redis::AsyncCommands;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    timeout: Duration,
}

impl RedisStore {
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let client = ::redis::Client::open(url)?;
        let connection = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| Error::StoreUnavailable(format!("connect to {} timed out", url)))??;

        tracing::info!("[RedisStore] Connected to {}", url);
        Ok(Self {
            connection,
            timeout,
        })
    }

    async fn bounded<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = ::redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| {
                tracing::error!("[RedisStore] {} failed: {}", op, e);
                Error::from(e)
            }),
            Err(_) => {
                tracing::error!("[RedisStore] {} timed out after {:?}", op, self.timeout);
                Err(Error::StoreUnavailable(format!(
                    "{} timed out after {:?}",
                    op, self.timeout
                )))
            }
        }
    }
}

fn whole_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        self.bounded("GET", conn.get::<_, Option<String>>(key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        let mut conn = self.connection.clone();
        match ttl {
            Some(ttl) => {
                self.bounded(
                    "SET EX",
                    conn.set_ex::<_, _, ()>(key, value, whole_seconds(ttl)),
                )
                .await?
            }
            None => self.bounded("SET", conn.set::<_, _, ()>(key, value)).await?,
        }
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        let removed: i64 = self.bounded("DEL", conn.del(key)).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        self.bounded("EXISTS", conn.exists::<_, bool>(key)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.connection.clone();
        let seconds = whole_seconds(ttl) as i64;
        self.bounded("EXPIRE", conn.expire::<_, bool>(key, seconds))
            .await
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        let mut conn = self.connection.clone();
        let seconds: i64 = self.bounded("TTL", conn.ttl(key)).await?;
        Ok(match seconds {
            -2 => KeyTtl::Missing,
            -1 => KeyTtl::Persistent,
            s => KeyTtl::Expires(Duration::from_secs(s.max(0) as u64)),
        })
    }
}

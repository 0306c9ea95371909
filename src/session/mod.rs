//! Login sessions binding a cookie id to an Instagram long-lived token

use crate::error::{Error, Result};
use crate::storage::{get_json, set_json, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const SESSION_PREFIX: &str = "session:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: String,
    pub username: String,
    pub access_token: String,
    #[serde(default)]
    pub account_type: Option<String>,
}

pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    fn key(session_id: &str) -> String {
        format!("{}{}", SESSION_PREFIX, session_id)
    }

    pub async fn create(&self, data: &SessionData) -> Result<String> {
        let session_id = Uuid::new_v4().simple().to_string();
        if !set_json(self.store.as_ref(), &Self::key(&session_id), data, Some(self.ttl)).await? {
            return Err(Error::StoreUnavailable("session was not stored".to_string()));
        }
        tracing::info!("[SessionManager] Created session for '{}'", data.username);
        Ok(session_id)
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<SessionData>> {
        get_json(self.store.as_ref(), &Self::key(session_id)).await
    }

    /// Replace the data of a live session and restart its TTL
    pub async fn update(&self, session_id: &str, data: &SessionData) -> Result<bool> {
        let key = Self::key(session_id);
        if !self.store.exists(&key).await? {
            return Ok(false);
        }
        set_json(self.store.as_ref(), &key, data, Some(self.ttl)).await
    }

    pub async fn delete(&self, session_id: &str) -> Result<bool> {
        self.store.delete(&Self::key(session_id)).await
    }

    pub async fn extend(&self, session_id: &str) -> Result<bool> {
        self.store.expire(&Self::key(session_id), self.ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyTtl, MemoryStore};

    fn data(username: &str) -> SessionData {
        SessionData {
            user_id: "42".to_string(),
            username: username.to_string(),
            access_token: "IGQV-token".to_string(),
            account_type: Some("BUSINESS".to_string()),
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let store = Arc::new(MemoryStore::new());
        let sessions = SessionManager::new(store.clone(), Duration::from_secs(60));

        let id = sessions.create(&data("bakery")).await.unwrap();
        assert_eq!(sessions.get(&id).await.unwrap(), Some(data("bakery")));

        assert!(sessions.update(&id, &data("bakery_2")).await.unwrap());
        assert_eq!(sessions.get(&id).await.unwrap().unwrap().username, "bakery_2");

        assert!(sessions.extend(&id).await.unwrap());
        assert!(matches!(
            store.ttl(&format!("session:{}", id)).await.unwrap(),
            KeyTtl::Expires(_)
        ));

        assert!(sessions.delete(&id).await.unwrap());
        assert_eq!(sessions.get(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_does_not_create() {
        let sessions = SessionManager::new(Arc::new(MemoryStore::new()), Duration::from_secs(60));
        assert!(!sessions.update("ghost", &data("bakery")).await.unwrap());
        assert_eq!(sessions.get("ghost").await.unwrap(), None);
        assert!(!sessions.extend("ghost").await.unwrap());
    }
}

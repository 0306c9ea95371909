//! Retrieval tokens for finished analyses

use super::AnalysisResult;
use crate::error::{Error, Result};
use crate::storage::{get_json, set_json, KeyValueStore};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn result_key(token: &str) -> String {
    format!("result:{}", token)
}

pub struct ResultStore {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl ResultStore {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Persist `result` and hand back the token that retrieves it
    pub async fn store(&self, result: &AnalysisResult) -> Result<String> {
        let token = Uuid::new_v4().to_string();
        if !set_json(self.store.as_ref(), &result_key(&token), result, Some(self.ttl)).await? {
            return Err(Error::StoreUnavailable(format!(
                "result for token '{}' was not stored",
                token
            )));
        }
        tracing::debug!("[ResultStore] Stored result under token {}", token);
        Ok(token)
    }

    pub async fn fetch(&self, token: &str) -> Result<AnalysisResult> {
        get_json(self.store.as_ref(), &result_key(token))
            .await?
            .ok_or_else(|| Error::NotFound(format!("no result for token '{}'", token)))
    }

    pub async fn delete(&self, token: &str) -> Result<bool> {
        self.store.delete(&result_key(token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ContentIdea;
    use crate::storage::MemoryStore;

    fn sample() -> AnalysisResult {
        AnalysisResult {
            account_summary: "A bakery, probably.".to_string(),
            content_ideas: vec![ContentIdea::fallback()],
            fallback_used: true,
        }
    }

    #[tokio::test]
    async fn test_store_then_fetch() {
        let results = ResultStore::new(Arc::new(MemoryStore::new()), Duration::from_secs(60));
        let token = results.store(&sample()).await.unwrap();

        assert!(Uuid::parse_str(&token).is_ok());
        assert_eq!(results.fetch(&token).await.unwrap(), sample());
    }

    #[tokio::test]
    async fn test_unknown_or_deleted_token_is_not_found() {
        let results = ResultStore::new(Arc::new(MemoryStore::new()), Duration::from_secs(60));
        assert!(matches!(
            results.fetch("nope").await,
            Err(Error::NotFound(_))
        ));

        let token = results.store(&sample()).await.unwrap();
        assert!(results.delete(&token).await.unwrap());
        assert!(matches!(
            results.fetch(&token).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_result_expires() {
        let results = ResultStore::new(Arc::new(MemoryStore::new()), Duration::from_secs(1));
        let token = results.store(&sample()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(matches!(
            results.fetch(&token).await,
            Err(Error::NotFound(_))
        ));
    }
}

//! Component wiring
//!
//! Built once at start-up from `Settings` and shared by reference; every
//! component receives its collaborators here instead of reaching for
//! process-wide state.

use crate::analysis::{AnalysisEngine, ResultStore};
use crate::config::{Settings, StoreBackend, StoreConfig};
use crate::context::ContextCache;
use crate::core::{CompletionClient, LLMClient};
use crate::error::Result;
use crate::novelty::NoveltyTracker;
use crate::replies::ReplyService;
use crate::session::SessionManager;
use crate::snapshot::{PersonaSource, SnapshotBuilder};
use crate::social::GraphConnector;
use crate::storage::{KeyValueStore, MemoryStore, RedisStore};
use std::sync::Arc;
use std::time::Duration;

/// Open the configured key-value backend
pub async fn connect_store(config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>> {
    Ok(match config.backend {
        StoreBackend::Redis => Arc::new(
            RedisStore::connect(&config.redis_url, Duration::from_millis(config.timeout_ms)).await?,
        ),
        StoreBackend::Memory => {
            tracing::warn!("[Services] Using in-memory store; state is lost on restart");
            Arc::new(MemoryStore::new())
        }
    })
}

#[derive(Clone)]
pub struct Services {
    pub settings: Settings,
    pub store: Arc<dyn KeyValueStore>,
    pub llm: Arc<dyn CompletionClient>,
    pub graph: GraphConnector,
    pub context: Arc<ContextCache>,
    pub novelty: Arc<NoveltyTracker>,
    pub analysis: Arc<AnalysisEngine>,
    pub results: Arc<ResultStore>,
    pub sessions: Arc<SessionManager>,
    pub replies: Arc<ReplyService>,
}

impl Services {
    /// Connect the configured store and build every component
    pub async fn from_settings(settings: Settings, api_key: String) -> Result<Self> {
        let store = connect_store(&settings.store).await?;
        let llm: Arc<dyn CompletionClient> = Arc::new(LLMClient::new(api_key, settings.llm.clone()));

        Ok(Self::assemble(settings, store, llm, Arc::new(SnapshotBuilder::new())))
    }

    /// Build every component over already constructed boundaries
    pub fn assemble(
        settings: Settings,
        store: Arc<dyn KeyValueStore>,
        llm: Arc<dyn CompletionClient>,
        personas: Arc<dyn PersonaSource>,
    ) -> Self {
        let context = Arc::new(ContextCache::new(
            store.clone(),
            personas,
            llm.clone(),
            settings.context.clone(),
        ));
        let novelty = Arc::new(NoveltyTracker::new(
            store.clone(),
            settings.novelty.index_ttl_secs.map(Duration::from_secs),
        ));
        let analysis = Arc::new(AnalysisEngine::new(llm.clone(), settings.analysis.max_images));
        let results = Arc::new(ResultStore::new(
            store.clone(),
            Duration::from_secs(settings.analysis.result_ttl_secs),
        ));
        let sessions = Arc::new(SessionManager::new(
            store.clone(),
            Duration::from_secs(settings.session.ttl_secs),
        ));
        let replies = Arc::new(ReplyService::new(
            context.clone(),
            store.clone(),
            Duration::from_secs(settings.replies.cache_ttl_secs),
        ));

        tracing::info!(
            "[Services] Ready (store: {:?}, model: {}, persist policy: {:?})",
            settings.store.backend,
            settings.llm.model,
            settings.context.persist_policy
        );

        Self {
            graph: GraphConnector::new(&settings.instagram),
            settings,
            store,
            llm,
            context,
            novelty,
            analysis,
            results,
            sessions,
            replies,
        }
    }
}

use anyhow::Result;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub llm: LLMConfig,
    pub instagram: InstagramConfig,
    pub store: StoreConfig,
    pub context: ContextConfig,
    #[serde(default)]
    pub novelty: NoveltyConfig,
    pub analysis: AnalysisConfig,
    pub replies: RepliesConfig,
    pub session: SessionConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramConfig {
    pub graph_base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_url: String,
    pub timeout_ms: u64,
}

/// What happens to a peer's conversation after a reply has been generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistPolicy {
    /// Stored entry only ever holds the persona; interactions are discarded
    Reseed,
    /// Interactions are written back, keeping the entry's remaining TTL
    EveryTurn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    pub ttl_secs: u64,
    pub persist_policy: PersistPolicy,
    pub renew_on_access: bool,
    pub max_turns: usize,
}

impl ContextConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoveltyConfig {
    pub index_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub result_ttl_secs: u64,
    pub max_images: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepliesConfig {
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub ttl_secs: u64,
    pub cookie_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Self::with_defaults(Config::builder())?
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Settings built from defaults only, ignoring files and environment
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::with_defaults(Config::builder())?.build()?.try_deserialize()
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("llm.model", "gpt-4.1-nano-2025-04-14")?
            .set_default("llm.max_tokens", 1000)?
            .set_default("llm.temperature", 0.7)?
            .set_default("llm.base_url", "https://api.openai.com/v1")?
            .set_default("llm.timeout_secs", 60)?
            .set_default("llm.max_retries", 3)?
            .set_default("instagram.graph_base_url", "https://graph.instagram.com/v23.0")?
            .set_default("instagram.timeout_secs", 20)?
            .set_default("store.backend", "redis")?
            .set_default("store.redis_url", "redis://127.0.0.1:6379/0")?
            .set_default("store.timeout_ms", 2000)?
            .set_default("context.ttl_secs", 100_000)?
            .set_default("context.persist_policy", "reseed")?
            .set_default("context.renew_on_access", false)?
            .set_default("context.max_turns", 40)?
            .set_default("analysis.result_ttl_secs", 3600)?
            .set_default("analysis.max_images", 3)?
            .set_default("replies.cache_ttl_secs", 86_400)?
            .set_default("session.ttl_secs", 86_400)?
            .set_default("session.cookie_name", "session_id")?
            .set_default("server.addr", "0.0.0.0:8000")?
            .set_default("logging.level", "info")
    }

    pub fn api_key() -> Result<String> {
        env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_deserialize() {
        let settings = Settings::defaults().unwrap();

        assert_eq!(settings.context.ttl_secs, 100_000);
        assert_eq!(settings.context.persist_policy, PersistPolicy::Reseed);
        assert!(!settings.context.renew_on_access);
        assert_eq!(settings.store.backend, StoreBackend::Redis);
        assert_eq!(settings.analysis.max_images, 3);
        assert!(settings.novelty.index_ttl_secs.is_none());
    }
}

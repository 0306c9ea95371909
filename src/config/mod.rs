mod settings;

pub use settings::{
    AnalysisConfig, ContextConfig, InstagramConfig, LLMConfig, LoggingConfig, NoveltyConfig,
    PersistPolicy, RepliesConfig, ServerConfig, SessionConfig, Settings, StoreBackend,
    StoreConfig,
};

//! Replify - persona-aware reply suggestions for Instagram accounts
//!
//! This library keeps one conversation per Instagram peer, seeded with a
//! persona extracted from the account's own posts, comments and dialogs,
//! and uses it to suggest replies. It also turns account screenshots into
//! content ideas.

pub mod analysis;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod novelty;
pub mod replies;
pub mod services;
pub mod session;
pub mod snapshot;
pub mod social;
pub mod storage;
pub mod utils;

pub mod cli;
pub mod server;

#[cfg(test)]
mod testing;

pub use crate::config::Settings;
pub use crate::error::{Error, Result};
pub use crate::services::Services;

// Re-export the seams callers implement or mock
pub use crate::core::{CompletionClient, Conversation, JsonSchemaFormat, ResponseFormat, Turn};
pub use crate::snapshot::PersonaSource;
pub use crate::social::SocialApi;
pub use crate::storage::KeyValueStore;

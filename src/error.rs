//! Error kinds shared by every replify component
//!
//! Each variant corresponds to one failure class the HTTP layer needs to
//! tell apart. Upstream detail is kept as a message string so callers can
//! log it without depending on transport crates.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Key-value backend unreachable, timed out, or rejected the command
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored conversation blob could not be turned back into turns
    #[error("corrupt conversation context for '{key}': {reason}")]
    CorruptContext { key: String, reason: String },

    /// Social graph API call failed or returned an unexpected shape
    #[error("upstream fetch failed ({endpoint}): {reason}")]
    UpstreamFetchFailed { endpoint: String, reason: String },

    /// Completion API failed or returned an unusable answer
    #[error("completion failed: {0}")]
    CompletionFailed(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn upstream(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Error::UpstreamFetchFailed {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    pub fn corrupt(key: impl Into<String>, reason: impl ToString) -> Self {
        Error::CorruptContext {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::StoreUnavailable(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

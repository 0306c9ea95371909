//! Reply suggestions for inbound comments and direct messages
//!
//! Each suggestion runs one context-cache transaction keyed by the author
//! of the comment or message. Finished suggestions are kept for a while
//! per (account, object) so reopening the same item does not regenerate.

use crate::context::{peer_key, ContextCache};
use crate::error::{Error, Result};
use crate::social::{SendMessageResponse, SocialApi};
use crate::storage::{get_json, set_json, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub object_id: String,
    /// Instagram id of the author the reply is meant for
    pub recipient_id: String,
    pub inbound: String,
    pub reply: String,
    #[serde(default)]
    pub cached: bool,
}

/// Where a reply gets delivered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyTarget {
    /// Direct message to a user id
    User(String),
    /// Private reply to the author of a comment
    Comment(String),
}

pub fn reply_key(account_id: &str, object_id: &str) -> String {
    format!("reply:{}:{}", account_id, object_id)
}

pub struct ReplyService {
    context: Arc<ContextCache>,
    store: Arc<dyn KeyValueStore>,
    cache_ttl: Duration,
}

impl ReplyService {
    pub fn new(context: Arc<ContextCache>, store: Arc<dyn KeyValueStore>, cache_ttl: Duration) -> Self {
        Self {
            context,
            store,
            cache_ttl,
        }
    }

    async fn cached(&self, key: &str) -> Result<Option<Suggestion>> {
        match get_json::<Suggestion>(self.store.as_ref(), key).await {
            Ok(found) => Ok(found.map(|s| Suggestion { cached: true, ..s })),
            Err(Error::CorruptContext { reason, .. }) => {
                tracing::warn!("[ReplyService] Ignoring unreadable cached reply '{}': {}", key, reason);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn generate(
        &self,
        client: &dyn SocialApi,
        key: &str,
        object_id: &str,
        author_id: &str,
        inbound: &str,
    ) -> Result<Suggestion> {
        let reply = self
            .context
            .handle_interaction(&peer_key(author_id), client, inbound)
            .await?;

        let suggestion = Suggestion {
            object_id: object_id.to_string(),
            recipient_id: author_id.to_string(),
            inbound: inbound.to_string(),
            reply,
            cached: false,
        };

        if let Err(e) = set_json(self.store.as_ref(), key, &suggestion, Some(self.cache_ttl)).await {
            tracing::warn!("[ReplyService] Could not cache reply '{}': {}", key, e);
        }
        Ok(suggestion)
    }

    pub async fn suggest_for_comment(&self, client: &dyn SocialApi, comment_id: &str) -> Result<Suggestion> {
        let account = client.me().await?;
        let key = reply_key(&account.user_id, comment_id);
        if let Some(hit) = self.cached(&key).await? {
            return Ok(hit);
        }

        let comment = client.comment_detail(comment_id).await?;
        let author = comment
            .from
            .as_ref()
            .ok_or_else(|| Error::upstream("comment_detail", "comment has no author"))?;

        tracing::info!(
            "[ReplyService] Suggesting reply to comment {} from '{}'",
            comment_id,
            comment.author_name()
        );
        self.generate(client, &key, comment_id, &author.id, &comment.text)
            .await
    }

    pub async fn suggest_for_message(&self, client: &dyn SocialApi, message_id: &str) -> Result<Suggestion> {
        let account = client.me().await?;
        let key = reply_key(&account.user_id, message_id);
        if let Some(hit) = self.cached(&key).await? {
            return Ok(hit);
        }

        let message = client.message_detail(message_id).await?;
        if message.from.id == account.user_id {
            return Err(Error::InvalidInput(format!(
                "message {} was sent by the account itself",
                message_id
            )));
        }

        tracing::info!(
            "[ReplyService] Suggesting reply to message {} from '{}'",
            message_id,
            message.from.display_name()
        );
        self.generate(client, &key, message_id, &message.from.id, &message.message)
            .await
    }

    /// Deliver `text` once; no retry, no delivery receipt beyond the API's answer
    pub async fn send_reply(
        &self,
        client: &dyn SocialApi,
        target: &ReplyTarget,
        text: &str,
    ) -> Result<SendMessageResponse> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("reply text is empty".to_string()));
        }
        match target {
            ReplyTarget::User(recipient_id) => client.send_text_message(recipient_id, text).await,
            ReplyTarget::Comment(comment_id) => client.send_private_reply(comment_id, text).await,
        }
    }
}

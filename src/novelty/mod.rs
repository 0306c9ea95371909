//! Novelty Tracker
//!
//! Keeps the last polled id list per (account, object kind) and flags ids
//! that were absent from it. The stored list is replaced on every poll,
//! even when the previous list could not be read; the diff itself is never
//! stored.

use crate::error::{Error, Result};
use crate::social::{MessageDetail, SocialApi};
use crate::storage::{get_json, set_json, KeyValueStore};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Comments,
    Messages,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Comments => "comments",
            ObjectKind::Messages => "messages",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flagged {
    pub id: String,
    pub is_new: bool,
}

impl Flagged {
    pub fn new(id: impl Into<String>, is_new: bool) -> Self {
        Self {
            id: id.into(),
            is_new,
        }
    }
}

pub fn index_key(account_key: &str, kind: ObjectKind) -> String {
    format!("{}_{}", kind.as_str(), account_key)
}

pub struct NoveltyTracker {
    store: Arc<dyn KeyValueStore>,
    ttl: Option<Duration>,
}

impl NoveltyTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Option<Duration>) -> Self {
        Self { store, ttl }
    }

    /// Flag each of `current_ids` as new unless the previous poll saw it
    pub async fn diff_and_update(
        &self,
        account_key: &str,
        kind: ObjectKind,
        current_ids: &[String],
    ) -> Result<Vec<Flagged>> {
        let key = index_key(account_key, kind);

        let previous: HashSet<String> = match get_json::<Vec<String>>(self.store.as_ref(), &key).await {
            Ok(Some(ids)) => ids.into_iter().collect(),
            Ok(None) => HashSet::new(),
            Err(e) => {
                tracing::warn!(
                    "[NoveltyTracker] Could not read previous index '{}', treating all ids as new: {}",
                    key,
                    e
                );
                HashSet::new()
            }
        };

        if !set_json(self.store.as_ref(), &key, current_ids, self.ttl).await? {
            return Err(Error::StoreUnavailable(format!(
                "write of '{}' was not acknowledged",
                key
            )));
        }

        let flagged: Vec<Flagged> = current_ids
            .iter()
            .map(|id| Flagged::new(id.clone(), !previous.contains(id)))
            .collect();

        tracing::debug!(
            "[NoveltyTracker] '{}': {} ids, {} new",
            key,
            flagged.len(),
            flagged.iter().filter(|f| f.is_new).count()
        );
        Ok(flagged)
    }
}

/// Poll every comment on the account's latest page of posts
pub async fn poll_comments(client: &dyn SocialApi, tracker: &NoveltyTracker) -> Result<Vec<Flagged>> {
    let account = client.me().await?;
    let posts = client.posts().await?;
    let pages = try_join_all(posts.data.iter().map(|post| client.comments(&post.id))).await?;

    let ids: Vec<String> = pages
        .into_iter()
        .flat_map(|page| page.data)
        .map(|comment| comment.id)
        .collect();

    tracker
        .diff_and_update(&account.user_id, ObjectKind::Comments, &ids)
        .await
}

/// Poll every message the account received (its own messages are skipped)
///
/// Each flag comes with the message as listed in its conversation, so
/// callers never need a per-message lookup.
pub async fn poll_messages(
    client: &dyn SocialApi,
    tracker: &NoveltyTracker,
) -> Result<Vec<(Flagged, MessageDetail)>> {
    let account = client.me().await?;
    let conversations = client.conversations().await?;
    let pages = try_join_all(
        conversations
            .data
            .iter()
            .map(|conversation| client.conversation_messages(&conversation.id)),
    )
    .await?;

    let messages: Vec<MessageDetail> = pages
        .into_iter()
        .flat_map(|page| page.data)
        .filter(|message| message.from.id != account.user_id)
        .collect();
    let ids: Vec<String> = messages.iter().map(|message| message.id.clone()).collect();

    let flagged = tracker
        .diff_and_update(&account.user_id, ObjectKind::Messages, &ids)
        .await?;
    Ok(flagged.into_iter().zip(messages).collect())
}

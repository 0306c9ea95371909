//! Social Snapshot Builder
//!
//! Information Hiding:
//! - Fetch ordering and fan-out hidden behind `PersonaSource`
//! - Text layout of the persona lives in `render`
//!
//! A build is all-or-nothing: the first failed upstream call aborts it and
//! no partial persona is returned. Retries belong to the caller.

pub mod render;

use crate::core::Persona;
use crate::error::Result;
use crate::social::{MessageDetail, SocialApi};
use async_trait::async_trait;
use futures::future::try_join_all;

/// Anything able to derive a persona for the account behind `client`
#[async_trait]
pub trait PersonaSource: Send + Sync {
    async fn build_persona(&self, client: &dyn SocialApi) -> Result<Persona>;
}

/// Full refetch of posts, comments and dialogs rendered into one persona
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Rendered lines for one post and its comments, plus its image locator
    async fn post_pieces(
        client: &dyn SocialApi,
        post_id: &str,
    ) -> Result<(Vec<String>, Option<String>)> {
        let post = client.post_detail(post_id).await?;
        let comment_refs = client.comments(post_id).await?;
        let comments = try_join_all(
            comment_refs
                .data
                .iter()
                .map(|comment| client.comment_detail(&comment.id)),
        )
        .await?;

        let mut pieces = Vec::with_capacity(comments.len() + 2);
        pieces.push(render::render_post(&post));
        pieces.push("Comments for the post:".to_string());
        pieces.extend(comments.iter().map(render::render_comment));

        Ok((pieces, post.image_url().map(str::to_string)))
    }

    async fn dialogs(client: &dyn SocialApi) -> Result<Vec<Vec<MessageDetail>>> {
        let conversations = client.conversations().await?;
        let pages = try_join_all(
            conversations
                .data
                .iter()
                .map(|conversation| client.conversation_messages(&conversation.id)),
        )
        .await?;
        Ok(pages.into_iter().map(|page| page.data).collect())
    }
}

#[async_trait]
impl PersonaSource for SnapshotBuilder {
    async fn build_persona(&self, client: &dyn SocialApi) -> Result<Persona> {
        let account = client.me().await?;
        let posts = client.posts().await?;

        tracing::info!(
            "[SnapshotBuilder] Building persona for '{}' from {} posts",
            account.username,
            posts.data.len()
        );

        let per_post = try_join_all(
            posts
                .data
                .iter()
                .map(|post| Self::post_pieces(client, &post.id)),
        )
        .await?;

        let mut pieces = Vec::new();
        let mut images = Vec::new();
        for (post_pieces, image) in per_post {
            pieces.extend(post_pieces);
            images.extend(image);
        }

        let dialogs = Self::dialogs(client).await?;
        pieces.push(render::render_dialogs(&dialogs, &account.user_id));

        tracing::debug!(
            "[SnapshotBuilder] Persona for '{}': {} pieces, {} images, {} dialogs",
            account.username,
            pieces.len(),
            images.len(),
            dialogs.len()
        );

        Ok(Persona {
            text: render::render_persona(&pieces),
            images,
        })
    }
}

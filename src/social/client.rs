//! Instagram Graph API client
//!
//! Information Hiding:
//! - URL layout, field selectors and token placement hidden from callers
//! - Every failure (transport, status, error body, schema) is reported as
//!   `UpstreamFetchFailed` naming the endpoint

use super::types::*;
use crate::config::InstagramConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio::sync::OnceCell;

const POST_FIELDS: &str = "id,caption,media_type,media_url,permalink,timestamp";
const COMMENT_FIELDS: &str = "id,text,username,timestamp,from,media";
const MESSAGE_FIELDS: &str = "id,created_time,from,to,message";

/// Read and send operations replify needs from the social network
#[async_trait]
pub trait SocialApi: Send + Sync {
    async fn me(&self) -> Result<Profile>;
    async fn posts(&self) -> Result<Page<ObjectRef>>;
    async fn post_detail(&self, post_id: &str) -> Result<PostDetail>;
    async fn comments(&self, post_id: &str) -> Result<Page<ObjectRef>>;
    async fn comment_detail(&self, comment_id: &str) -> Result<CommentDetail>;
    async fn conversations(&self) -> Result<Page<ObjectRef>>;
    async fn conversation_messages(&self, conversation_id: &str) -> Result<Page<MessageDetail>>;
    async fn message_detail(&self, message_id: &str) -> Result<MessageDetail>;
    async fn send_text_message(&self, recipient_id: &str, text: &str) -> Result<SendMessageResponse>;
    async fn send_private_reply(&self, comment_id: &str, text: &str) -> Result<SendMessageResponse>;
}

/// Shared HTTP pool; hands out one authenticated client per request
#[derive(Clone)]
pub struct GraphConnector {
    http: Client,
    base_url: String,
}

impl GraphConnector {
    pub fn new(config: &InstagramConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: config.graph_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn client(&self, access_token: impl Into<String>) -> InstagramClient {
        InstagramClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            access_token: access_token.into(),
            profile: OnceCell::new(),
        }
    }
}

/// Client bound to one long-lived access token
pub struct InstagramClient {
    http: Client,
    base_url: String,
    access_token: String,
    profile: OnceCell<Profile>,
}

impl InstagramClient {
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http
            .get(self.url(path))
            .query(&[("access_token", self.access_token.as_str())])
    }

    async fn fetch<T: DeserializeOwned>(&self, endpoint: &str, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!("[InstagramClient] {} request failed: {}", endpoint, e);
            Error::upstream(endpoint, e)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| Error::upstream(endpoint, e))?;

        if !status.is_success() {
            tracing::warn!("[InstagramClient] {} returned {}: {}", endpoint, status, body);
            return Err(Error::upstream(endpoint, format!("status {}: {}", status, body)));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("[InstagramClient] {} returned unexpected body: {}", endpoint, e);
            Error::upstream(endpoint, format!("unexpected response shape: {}", e))
        })
    }

    async fn send(&self, endpoint: &str, recipient: serde_json::Value, text: &str) -> Result<SendMessageResponse> {
        let account = self.me().await?;
        let request = self
            .http
            .post(self.url(&format!("{}/messages", account.user_id)))
            .bearer_auth(&self.access_token)
            .json(&json!({
                "recipient": recipient,
                "message": {"text": text},
            }));
        self.fetch(endpoint, request).await
    }
}

#[async_trait]
impl SocialApi for InstagramClient {
    async fn me(&self) -> Result<Profile> {
        self.profile
            .get_or_try_init(|| async {
                self.fetch(
                    "me",
                    self.get("me")
                        .query(&[("fields", "user_id,username,account_type")]),
                )
                .await
            })
            .await
            .cloned()
    }

    // One page only; older posts are not followed through `paging.next`.
    async fn posts(&self) -> Result<Page<ObjectRef>> {
        self.fetch("posts", self.get("me/media")).await
    }

    async fn post_detail(&self, post_id: &str) -> Result<PostDetail> {
        self.fetch("post_detail", self.get(post_id).query(&[("fields", POST_FIELDS)]))
            .await
    }

    async fn comments(&self, post_id: &str) -> Result<Page<ObjectRef>> {
        self.fetch("comments", self.get(&format!("{}/comments", post_id)))
            .await
    }

    async fn comment_detail(&self, comment_id: &str) -> Result<CommentDetail> {
        self.fetch(
            "comment_detail",
            self.get(comment_id).query(&[("fields", COMMENT_FIELDS)]),
        )
        .await
    }

    async fn conversations(&self) -> Result<Page<ObjectRef>> {
        self.fetch(
            "conversations",
            self.get("me/conversations").query(&[("platform", "instagram")]),
        )
        .await
    }

    async fn conversation_messages(&self, conversation_id: &str) -> Result<Page<MessageDetail>> {
        self.fetch(
            "conversation_messages",
            self.get(&format!("{}/messages", conversation_id))
                .query(&[("fields", MESSAGE_FIELDS)]),
        )
        .await
    }

    async fn message_detail(&self, message_id: &str) -> Result<MessageDetail> {
        self.fetch(
            "message_detail",
            self.get(message_id).query(&[("fields", MESSAGE_FIELDS)]),
        )
        .await
    }

    async fn send_text_message(&self, recipient_id: &str, text: &str) -> Result<SendMessageResponse> {
        self.send("send_text_message", json!({"id": recipient_id}), text)
            .await
    }

    async fn send_private_reply(&self, comment_id: &str, text: &str) -> Result<SendMessageResponse> {
        self.send("send_private_reply", json!({"comment_id": comment_id}), text)
            .await
    }
}

/// Comment joined with the post it was left on
pub async fn comment_info(client: &dyn SocialApi, comment_id: &str) -> Result<CommentInfo> {
    let comment = client.comment_detail(comment_id).await?;
    let post_id = comment
        .media
        .as_ref()
        .map(|media| media.id.clone())
        .ok_or_else(|| Error::upstream("comment_detail", "comment has no parent media"))?;
    let post = client.post_detail(&post_id).await?;

    Ok(CommentInfo {
        username: comment.author_name().to_string(),
        id: comment.id,
        text: comment.text,
        timestamp: comment.timestamp,
        post_id,
        post_caption: post.caption,
        post_media_url: post.media_url,
    })
}

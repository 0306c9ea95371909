//! Typed views of the Graph API responses replify reads
//!
//! Only fields the snapshot, novelty and reply paths consume are modelled.
//! Required fields are plain types so a renamed or missing field fails at
//! decode time instead of deep inside rendering.

use serde::{Deserialize, Serialize};

/// `GET /me?fields=user_id,username`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Stable account id; also the sender id on messages the account sends
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub account_type: Option<String>,
}

/// Generic `{"data": [...]}` envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub cursors: Option<Cursors>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cursors {
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaType {
    Image,
    Video,
    CarouselAlbum,
    #[serde(other)]
    Other,
}

/// `GET /{media-id}?fields=id,caption,media_type,media_url,permalink,timestamp`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetail {
    pub id: String,
    /// Absent on posts published without a caption
    #[serde(default)]
    pub caption: Option<String>,
    pub media_type: MediaType,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    pub timestamp: String,
}

impl PostDetail {
    /// Media locator worth attaching to a multimodal prompt
    pub fn image_url(&self) -> Option<&str> {
        match self.media_type {
            MediaType::Image => self.media_url.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
}

impl Participant {
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.id)
    }
}

/// `GET /{comment-id}?fields=id,text,username,timestamp,from,media`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentDetail {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub username: Option<String>,
    pub timestamp: String,
    #[serde(default)]
    pub from: Option<Participant>,
    #[serde(default)]
    pub media: Option<ObjectRef>,
}

impl CommentDetail {
    pub fn author_name(&self) -> &str {
        self.username
            .as_deref()
            .or_else(|| self.from.as_ref().and_then(|from| from.username.as_deref()))
            .unwrap_or("unknown")
    }
}

/// Message `to` field is a list wrapped in `data`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipients {
    pub data: Vec<Participant>,
}

/// `GET /{message-id}?fields=id,created_time,from,to,message`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDetail {
    pub id: String,
    pub created_time: String,
    pub from: Participant,
    pub to: Recipients,
    /// Empty for attachment-only messages
    #[serde(default)]
    pub message: String,
}

impl MessageDetail {
    pub fn first_recipient(&self) -> Option<&Participant> {
        self.to.data.first()
    }
}

/// `POST /{account-id}/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub recipient_id: Option<String>,
    pub message_id: String,
}

/// Comment joined with its parent post, as shown in the comment list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentInfo {
    pub id: String,
    pub text: String,
    pub username: String,
    pub timestamp: String,
    pub post_id: String,
    pub post_caption: Option<String>,
    pub post_media_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_detail_decodes_graph_shape() {
        let message: MessageDetail = serde_json::from_value(json!({
            "id": "m1",
            "created_time": "2025-05-01T10:00:00+0000",
            "from": {"id": "42", "username": "bakery"},
            "to": {"data": [{"id": "77", "username": "alice"}]},
            "message": "hi there"
        }))
        .unwrap();

        assert_eq!(message.first_recipient().unwrap().display_name(), "alice");
        assert_eq!(message.from.id, "42");
    }

    #[test]
    fn test_post_missing_media_type_fails() {
        let result = serde_json::from_value::<PostDetail>(json!({
            "id": "p1",
            "caption": "x",
            "timestamp": "2025-05-01T10:00:00+0000"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_only_images_have_locators() {
        let post: PostDetail = serde_json::from_value(json!({
            "id": "p1",
            "media_type": "VIDEO",
            "media_url": "https://cdn.example/v.mp4",
            "timestamp": "2025-05-01T10:00:00+0000"
        }))
        .unwrap();
        assert!(post.image_url().is_none());
        assert!(post.caption.is_none());
    }
}

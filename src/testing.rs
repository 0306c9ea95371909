//! In-process fakes for the social and completion boundaries

use crate::core::{CompletionClient, JsonSchemaFormat, Turn};
use crate::error::{Error, Result};
use crate::social::*;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

const TS: &str = "2025-05-01T10:00:00+0000";

pub struct FakeSocial {
    profile: Profile,
    posts: Vec<PostDetail>,
    comments: HashMap<String, Vec<CommentDetail>>,
    dialogs: Vec<(String, Vec<MessageDetail>)>,
    fail_on: Option<&'static str>,
    pub me_calls: AtomicUsize,
    pub sent: Mutex<Vec<(String, String)>>,
}

impl FakeSocial {
    pub fn new(user_id: &str, username: &str) -> Self {
        Self {
            profile: Profile {
                user_id: user_id.to_string(),
                username: username.to_string(),
                account_type: Some("BUSINESS".to_string()),
            },
            posts: Vec::new(),
            comments: HashMap::new(),
            dialogs: Vec::new(),
            fail_on: None,
            me_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_post(mut self, id: &str, caption: &str, image: Option<&str>) -> Self {
        self.posts.push(PostDetail {
            id: id.to_string(),
            caption: Some(caption.to_string()),
            media_type: if image.is_some() {
                MediaType::Image
            } else {
                MediaType::Video
            },
            media_url: image.map(str::to_string),
            permalink: None,
            timestamp: TS.to_string(),
        });
        self
    }

    pub fn with_comment(mut self, post_id: &str, id: &str, author: (&str, &str), text: &str) -> Self {
        self.comments
            .entry(post_id.to_string())
            .or_default()
            .push(CommentDetail {
                id: id.to_string(),
                text: text.to_string(),
                username: Some(author.1.to_string()),
                timestamp: TS.to_string(),
                from: Some(Participant {
                    id: author.0.to_string(),
                    username: Some(author.1.to_string()),
                }),
                media: Some(ObjectRef {
                    id: post_id.to_string(),
                }),
            });
        self
    }

    pub fn with_message(mut self, conversation_id: &str, id: &str, from: (&str, &str), to: (&str, &str), text: &str) -> Self {
        let message = MessageDetail {
            id: id.to_string(),
            created_time: TS.to_string(),
            from: Participant {
                id: from.0.to_string(),
                username: Some(from.1.to_string()),
            },
            to: Recipients {
                data: vec![Participant {
                    id: to.0.to_string(),
                    username: Some(to.1.to_string()),
                }],
            },
            message: text.to_string(),
        };
        match self.dialogs.iter_mut().find(|(id, _)| id == conversation_id) {
            Some((_, messages)) => messages.push(message),
            None => self.dialogs.push((conversation_id.to_string(), vec![message])),
        }
        self
    }

    pub fn failing_on(mut self, endpoint: &'static str) -> Self {
        self.fail_on = Some(endpoint);
        self
    }

    fn check(&self, endpoint: &str) -> Result<()> {
        match self.fail_on {
            Some(failing) if failing == endpoint => Err(Error::upstream(endpoint, "injected failure")),
            _ => Ok(()),
        }
    }

    fn refs<'a>(ids: impl Iterator<Item = &'a str>) -> Page<ObjectRef> {
        Page {
            data: ids.map(|id| ObjectRef { id: id.to_string() }).collect(),
            paging: None,
        }
    }
}

#[async_trait]
impl SocialApi for FakeSocial {
    async fn me(&self) -> Result<Profile> {
        self.check("me")?;
        self.me_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.profile.clone())
    }

    async fn posts(&self) -> Result<Page<ObjectRef>> {
        self.check("posts")?;
        Ok(Self::refs(self.posts.iter().map(|p| p.id.as_str())))
    }

    async fn post_detail(&self, post_id: &str) -> Result<PostDetail> {
        self.check("post_detail")?;
        self.posts
            .iter()
            .find(|p| p.id == post_id)
            .cloned()
            .ok_or_else(|| Error::upstream("post_detail", "no such post"))
    }

    async fn comments(&self, post_id: &str) -> Result<Page<ObjectRef>> {
        self.check("comments")?;
        let comments = self.comments.get(post_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(Self::refs(comments.iter().map(|c| c.id.as_str())))
    }

    async fn comment_detail(&self, comment_id: &str) -> Result<CommentDetail> {
        self.check("comment_detail")?;
        self.comments
            .values()
            .flatten()
            .find(|c| c.id == comment_id)
            .cloned()
            .ok_or_else(|| Error::upstream("comment_detail", "no such comment"))
    }

    async fn conversations(&self) -> Result<Page<ObjectRef>> {
        self.check("conversations")?;
        Ok(Self::refs(self.dialogs.iter().map(|(id, _)| id.as_str())))
    }

    async fn conversation_messages(&self, conversation_id: &str) -> Result<Page<MessageDetail>> {
        self.check("conversation_messages")?;
        let messages = self
            .dialogs
            .iter()
            .find(|(id, _)| id == conversation_id)
            .map(|(_, messages)| messages.clone())
            .unwrap_or_default();
        Ok(Page {
            data: messages,
            paging: None,
        })
    }

    async fn message_detail(&self, message_id: &str) -> Result<MessageDetail> {
        self.check("message_detail")?;
        self.dialogs
            .iter()
            .flat_map(|(_, messages)| messages)
            .find(|m| m.id == message_id)
            .cloned()
            .ok_or_else(|| Error::upstream("message_detail", "no such message"))
    }

    async fn send_text_message(&self, recipient_id: &str, text: &str) -> Result<SendMessageResponse> {
        self.check("send_text_message")?;
        self.sent
            .lock()
            .unwrap()
            .push((recipient_id.to_string(), text.to_string()));
        Ok(SendMessageResponse {
            recipient_id: Some(recipient_id.to_string()),
            message_id: "mid.fake".to_string(),
        })
    }

    async fn send_private_reply(&self, comment_id: &str, text: &str) -> Result<SendMessageResponse> {
        self.send_text_message(comment_id, text).await
    }
}

/// Scripted completion answers; records every turn sequence it receives
#[derive(Default)]
pub struct FakeCompletion {
    texts: Mutex<VecDeque<Result<String>>>,
    json: Mutex<VecDeque<Result<Value>>>,
    pub calls: Mutex<Vec<Vec<Turn>>>,
}

impl FakeCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.texts.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self) -> Self {
        self.texts
            .lock()
            .unwrap()
            .push_back(Err(Error::CompletionFailed("scripted failure".to_string())));
        self
    }

    pub fn json(self, value: Value) -> Self {
        self.json.lock().unwrap().push_back(Ok(value));
        self
    }

    pub fn json_fail(self) -> Self {
        self.json
            .lock()
            .unwrap()
            .push_back(Err(Error::CompletionFailed("scripted failure".to_string())));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Vec<Turn> {
        self.calls.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CompletionClient for FakeCompletion {
    async fn complete(&self, turns: &[Turn]) -> Result<String> {
        self.calls.lock().unwrap().push(turns.to_vec());
        self.texts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("fake reply".to_string()))
    }

    async fn complete_json(&self, turns: &[Turn], _schema: &JsonSchemaFormat) -> Result<Value> {
        self.calls.lock().unwrap().push(turns.to_vec());
        self.json
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::CompletionFailed("no scripted json".to_string())))
    }
}

//! Conversation model shared by the context cache and the completion client
//!
//! Information Hiding:
//! - Stored JSON layout is private to `serialize`/`deserialize`
//! - Wire format of the completion API is handled in `core::llm`, not here

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    Image { url: String },
}

/// Either a bare string or a list of typed parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Content {
    /// Concatenated text of every text part, images skipped
    pub fn text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn image_urls(&self) -> Vec<&str> {
        match self {
            Content::Text(_) => Vec::new(),
            Content::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Image { url } => Some(url.as_str()),
                    ContentPart::Text { .. } => None,
                })
                .collect(),
        }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: Content,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<Content>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<Content>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<Content>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<Content>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Instruction block plus the image locators it refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub text: String,
    pub images: Vec<String>,
}

impl Persona {
    pub fn into_content(self) -> Content {
        if self.images.is_empty() {
            return Content::Text(self.text);
        }
        let mut parts = Vec::with_capacity(self.images.len() + 1);
        parts.push(ContentPart::Text { text: self.text });
        parts.extend(self.images.into_iter().map(|url| ContentPart::Image { url }));
        Content::Parts(parts)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredConversation {
    turns: Vec<Turn>,
}

/// Ordered, role-tagged turn sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation whose only turn is the persona as a system instruction
    pub fn seeded(persona: Persona) -> Self {
        Self {
            turns: vec![Turn::system(persona.into_content())],
        }
    }

    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn has_persona(&self) -> bool {
        matches!(self.turns.first(), Some(turn) if turn.role == Role::System)
    }

    /// Drop the oldest non-persona turns until at most `max_turns` remain
    pub fn trim_to(&mut self, max_turns: usize) {
        if self.turns.len() <= max_turns {
            return;
        }
        let keep_from = if self.has_persona() { 1 } else { 0 };
        let excess = self.turns.len() - max_turns.max(keep_from);
        self.turns.drain(keep_from..keep_from + excess);
    }

    pub fn serialize(&self) -> Result<String> {
        let stored = StoredConversation {
            turns: self.turns.clone(),
        };
        serde_json::to_string(&stored)
            .map_err(|e| Error::InvalidInput(format!("conversation not serializable: {}", e)))
    }

    /// Parse a stored blob; `key` only labels the error
    pub fn deserialize(key: &str, blob: &str) -> Result<Self> {
        let stored: StoredConversation =
            serde_json::from_str(blob).map_err(|e| Error::corrupt(key, e))?;
        Ok(Self {
            turns: stored.turns,
        })
    }
}

//! Analysis Engine
//!
//! Information Hiding:
//! - Prompt texts and the ideas JSON schema stay private to this module
//! - Image encoding (base64 data URLs) hidden from callers
//!
//! Two completion calls per analysis: a free-text account summary, then a
//! schema-constrained list of content ideas. A failed summary fails the
//! analysis. A failed or empty ideas answer falls back to one fixed idea.

pub mod results;

pub use results::ResultStore;

use crate::core::{complete_structured, CompletionClient, Content, ContentPart, JsonSchemaFormat, Turn};
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

/// Upper bound on ideas kept from one answer
pub const MAX_IDEAS: usize = 7;

const SYSTEM_INSTRUCTIONS: &str = r#"# Identity

You are helpful, friendly and creative SMM assistant that helps social media account owners to come up with content ideas.

# Instructions

* Never mention that you are AI, your responses will NEVER include warnings, disclaimers, etc. such as, but not limited to, "As an AI", "As a large language model", "As an artificial intelligence, I don't have feelings or emotions". The user already knows you are an LLM. Just skip to the answer.
* Never use complex language, remember that you are a social media assistant, so never use language more advanced than the one used commonly on social media
* DO NOT use the "—" character EVER in your outputs
* Your answer must be directly an answer to the question. If you have nothing to answer - return empty answer"#;

const SUMMARY_INSTRUCTIONS: &str = r#"Analyze these screenshots of a social media account and additional description by account's owner if provided and give a short one paragraph summary of the account topic.

Your conclusions about accounts purpose could be inaccurate, so don't use definitive statements."#;

const CONTENT_IDEAS_INSTRUCTIONS: &str = r#"Generate 5-7 content ideas that align with the provided account description and style.
Attached screenshots of the account might be provided to help you understand the account.
Each idea should include:
* content_type: Type of the content (e.g. post, story, reel, etc.);
* title: A clear title;
* theme: Theme or concept: no more that 10 words;
* caption_draft: An engaging caption draft: don't make it too long;
* hashtag_suggestions: Relevant hashtag suggestions;
* reason: Reason why this idea is relevant to the account and might be engaging for the audience: 1-2 short sentences.

Make each idea distinct and tailored to the account's aesthetic and audience."#;

/// One uploaded screenshot
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
        }
    }

    /// Read an image from disk, guessing its MIME type from the extension
    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            Error::InvalidInput(format!("cannot read image '{}': {}", path.display(), e))
        })?;
        let mime = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream");
        Ok(Self::new(bytes, mime))
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image/")
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentIdea {
    pub content_type: String,
    pub title: String,
    pub theme: String,
    pub caption_draft: String,
    pub hashtag_suggestions: Vec<String>,
    pub reason: String,
}

impl ContentIdea {
    /// Substitute used when no usable idea came back
    pub fn fallback() -> Self {
        Self {
            content_type: "post".to_string(),
            title: "Engaging Content Idea".to_string(),
            theme: "General engagement post based on your account theme".to_string(),
            caption_draft: "This is a suggested caption based on your content style.".to_string(),
            hashtag_suggestions: vec![
                "#content".to_string(),
                "#socialmedia".to_string(),
                "#engagement".to_string(),
            ],
            reason: "This idea is relevant to the account and might be engaging for the audience"
                .to_string(),
        }
    }

    /// Every required field carries something
    pub fn is_complete(&self) -> bool {
        [
            &self.content_type,
            &self.title,
            &self.theme,
            &self.caption_draft,
            &self.reason,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
            && self.hashtag_suggestions.iter().any(|tag| !tag.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub account_summary: String,
    pub content_ideas: Vec<ContentIdea>,
    #[serde(default)]
    pub fallback_used: bool,
}

#[derive(Debug, Deserialize)]
struct IdeasEnvelope {
    #[serde(default)]
    content_ideas: Vec<Value>,
}

fn ideas_schema() -> JsonSchemaFormat {
    let text = json!({"type": "string"});
    JsonSchemaFormat {
        name: "content_ideas".to_string(),
        description: Some("Content ideas tailored to the analyzed account".to_string()),
        schema: json!({
            "type": "object",
            "properties": {
                "content_ideas": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "content_type": text,
                            "title": text,
                            "theme": text,
                            "caption_draft": text,
                            "hashtag_suggestions": {"type": "array", "items": text},
                            "reason": text
                        },
                        "required": [
                            "content_type", "title", "theme",
                            "caption_draft", "hashtag_suggestions", "reason"
                        ],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["content_ideas"],
            "additionalProperties": false
        }),
        strict: true,
    }
}

/// Keep at most `MAX_IDEAS` complete ideas, in answer order
fn sanitize_ideas(raw: Vec<Value>) -> Vec<ContentIdea> {
    let total = raw.len();
    let ideas: Vec<ContentIdea> = raw
        .into_iter()
        .filter_map(|value| serde_json::from_value::<ContentIdea>(value).ok())
        .filter(ContentIdea::is_complete)
        .take(MAX_IDEAS)
        .collect();

    if ideas.len() < total.min(MAX_IDEAS) {
        tracing::warn!(
            "[AnalysisEngine] Dropped {} incomplete ideas",
            total.min(MAX_IDEAS) - ideas.len()
        );
    }
    ideas
}

pub struct AnalysisEngine {
    llm: Arc<dyn CompletionClient>,
    max_images: usize,
}

impl AnalysisEngine {
    pub fn new(llm: Arc<dyn CompletionClient>, max_images: usize) -> Self {
        Self { llm, max_images }
    }

    fn validate(&self, images: &[ImageInput]) -> Result<()> {
        if images.is_empty() {
            return Err(Error::InvalidInput("at least one image is required".to_string()));
        }
        if images.len() > self.max_images {
            return Err(Error::InvalidInput(format!(
                "at most {} images are accepted, got {}",
                self.max_images,
                images.len()
            )));
        }
        if let Some(bad) = images.iter().find(|image| !image.is_image()) {
            return Err(Error::InvalidInput(format!(
                "unsupported content type '{}'",
                bad.mime
            )));
        }
        Ok(())
    }

    fn request(instructions: &str, context: Option<String>, images: &[ImageInput]) -> Vec<Turn> {
        let mut parts = vec![ContentPart::Text {
            text: instructions.to_string(),
        }];
        parts.extend(context.map(|text| ContentPart::Text { text }));
        parts.extend(images.iter().map(|image| ContentPart::Image {
            url: image.data_url(),
        }));

        vec![
            Turn::system(SYSTEM_INSTRUCTIONS),
            Turn::user(Content::Parts(parts)),
        ]
    }

    pub async fn analyze(
        &self,
        images: &[ImageInput],
        description: Option<&str>,
    ) -> Result<AnalysisResult> {
        self.validate(images)?;
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        tracing::info!(
            "[AnalysisEngine] Analyzing {} images (description: {})",
            images.len(),
            description.is_some()
        );

        let summary_request = Self::request(
            SUMMARY_INSTRUCTIONS,
            description.map(|d| format!("Account description by account's owner: {}", d)),
            images,
        );
        let account_summary = self.llm.complete(&summary_request).await?;

        let mut context = format!("Account summary: {}", account_summary);
        if let Some(d) = description {
            context.push_str(&format!("\nAdditional account context: {}", d));
        }
        let ideas_request = Self::request(CONTENT_IDEAS_INSTRUCTIONS, Some(context), images);

        let ideas = match complete_structured::<IdeasEnvelope>(
            self.llm.as_ref(),
            &ideas_request,
            &ideas_schema(),
        )
        .await
        {
            Ok(envelope) => sanitize_ideas(envelope.content_ideas),
            Err(e) => {
                tracing::warn!("[AnalysisEngine] Structured ideas failed, using fallback: {}", e);
                Vec::new()
            }
        };

        let fallback_used = ideas.is_empty();
        let content_ideas = if fallback_used {
            vec![ContentIdea::fallback()]
        } else {
            ideas
        };

        Ok(AnalysisResult {
            account_summary,
            content_ideas,
            fallback_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Role;
    use crate::testing::FakeCompletion;

    fn idea(title: &str) -> Value {
        json!({
            "content_type": "reel",
            "title": title,
            "theme": "Morning baking routine",
            "caption_draft": "Rise and shine with us",
            "hashtag_suggestions": ["#bakery"],
            "reason": "Followers love process shots."
        })
    }

    fn png() -> ImageInput {
        ImageInput::new(vec![0x89, 0x50, 0x4e, 0x47], "image/png")
    }

    fn engine(llm: FakeCompletion) -> (Arc<FakeCompletion>, AnalysisEngine) {
        let llm = Arc::new(llm);
        (llm.clone(), AnalysisEngine::new(llm, 3))
    }

    #[tokio::test]
    async fn test_analyze_returns_summary_and_ideas() {
        let ideas: Vec<Value> = (1..=5).map(|i| idea(&format!("Idea {}", i))).collect();
        let (llm, engine) = engine(
            FakeCompletion::new()
                .reply("Looks like a small bakery.")
                .json(json!({ "content_ideas": ideas })),
        );

        let result = engine.analyze(&[png()], Some("family bakery")).await.unwrap();

        assert_eq!(result.account_summary, "Looks like a small bakery.");
        assert_eq!(result.content_ideas.len(), 5);
        assert!(!result.fallback_used);

        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let summary_user = &calls[0][1];
        assert_eq!(summary_user.role, Role::User);
        assert!(summary_user
            .content
            .text()
            .contains("Account description by account's owner: family bakery"));
        assert_eq!(
            summary_user.content.image_urls(),
            vec!["data:image/png;base64,iVBORw=="]
        );
        assert!(calls[1][1].content.text().contains("Looks like a small bakery."));
    }

    #[tokio::test]
    async fn test_ideas_are_capped_at_seven() {
        let ideas: Vec<Value> = (1..=9).map(|i| idea(&format!("Idea {}", i))).collect();
        let (_, engine) = engine(
            FakeCompletion::new()
                .reply("summary")
                .json(json!({ "content_ideas": ideas })),
        );

        let result = engine.analyze(&[png()], None).await.unwrap();
        assert_eq!(result.content_ideas.len(), MAX_IDEAS);
        assert_eq!(result.content_ideas[6].title, "Idea 7");
    }

    #[tokio::test]
    async fn test_incomplete_ideas_are_dropped() {
        let (_, engine) = engine(FakeCompletion::new().reply("summary").json(json!({
            "content_ideas": [idea("Keep me"), idea(""), {"title": "missing fields"}]
        })));

        let result = engine.analyze(&[png()], None).await.unwrap();
        assert_eq!(result.content_ideas.len(), 1);
        assert_eq!(result.content_ideas[0].title, "Keep me");
        assert!(result.content_ideas.iter().all(ContentIdea::is_complete));
    }

    #[tokio::test]
    async fn test_failed_structured_call_uses_fallback() {
        let (_, engine) = engine(FakeCompletion::new().reply("summary").json_fail());

        let result = engine.analyze(&[png()], None).await.unwrap();
        assert!(result.fallback_used);
        assert_eq!(result.content_ideas, vec![ContentIdea::fallback()]);
    }

    #[tokio::test]
    async fn test_empty_ideas_use_fallback() {
        let (_, engine) = engine(
            FakeCompletion::new()
                .reply("summary")
                .json(json!({ "content_ideas": [] })),
        );

        let result = engine.analyze(&[png()], None).await.unwrap();
        assert!(result.fallback_used);
        assert_eq!(result.content_ideas.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_summary_fails_analysis() {
        let (llm, engine) = engine(FakeCompletion::new().fail());

        let err = engine.analyze(&[png()], None).await.unwrap_err();
        assert!(matches!(err, Error::CompletionFailed(_)));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_image_count_and_type_are_validated() {
        let (llm, engine) = engine(FakeCompletion::new());

        assert!(matches!(
            engine.analyze(&[], None).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            engine.analyze(&[png(), png(), png(), png()], None).await,
            Err(Error::InvalidInput(_))
        ));
        let pdf = ImageInput::new(b"%PDF".to_vec(), "application/pdf");
        assert!(matches!(
            engine.analyze(&[pdf], None).await,
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_image_from_path_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.jpg");
        tokio::fs::write(&path, [0xff, 0xd8, 0xff]).await.unwrap();

        let image = ImageInput::from_path(&path).await.unwrap();
        assert_eq!(image.mime, "image/jpeg");
        assert!(image.data_url().starts_with("data:image/jpeg;base64,"));
    }
}

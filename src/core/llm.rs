use crate::config::LLMConfig;
use crate::core::conversation::{Content, ContentPart, Role, Turn};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    JsonSchema {
        json_schema: JsonSchemaFormat,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: Value,
    #[serde(default = "default_strict")]
    pub strict: bool,
}

fn default_strict() -> bool {
    true
}

/// Stateless completion seam; fakes implement this in tests
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Free-text answer for the given turn sequence
    async fn complete(&self, turns: &[Turn]) -> Result<String>;

    /// Raw JSON answer constrained by `schema`
    async fn complete_json(&self, turns: &[Turn], schema: &JsonSchemaFormat) -> Result<Value>;
}

/// Schema-constrained completion parsed into `T`
pub async fn complete_structured<T: DeserializeOwned>(
    client: &dyn CompletionClient,
    turns: &[Turn],
    schema: &JsonSchemaFormat,
) -> Result<T> {
    let value = client.complete_json(turns, schema).await?;
    serde_json::from_value(value).map_err(|e| {
        Error::CompletionFailed(format!("response does not match schema '{}': {}", schema.name, e))
    })
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: Role,
    content: WireContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WirePart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// System messages cannot carry images on the chat endpoint, so a system
/// turn with image parts is sent as its text followed by a user message
/// holding the images.
fn to_wire(turns: &[Turn]) -> Vec<WireMessage> {
    let mut messages = Vec::with_capacity(turns.len() + 1);
    for turn in turns {
        match (&turn.role, &turn.content) {
            (_, Content::Text(text)) => messages.push(WireMessage {
                role: turn.role,
                content: WireContent::Text(text.clone()),
            }),
            (Role::System, content) => {
                messages.push(WireMessage {
                    role: Role::System,
                    content: WireContent::Text(content.text()),
                });
                let images: Vec<WirePart> = content
                    .image_urls()
                    .into_iter()
                    .map(|url| WirePart::ImageUrl {
                        image_url: ImageUrl { url: url.to_string() },
                    })
                    .collect();
                if !images.is_empty() {
                    messages.push(WireMessage {
                        role: Role::User,
                        content: WireContent::Parts(images),
                    });
                }
            }
            (role, Content::Parts(parts)) => messages.push(WireMessage {
                role: *role,
                content: WireContent::Parts(
                    parts
                        .iter()
                        .map(|part| match part {
                            ContentPart::Text { text } => WirePart::Text { text: text.clone() },
                            ContentPart::Image { url } => WirePart::ImageUrl {
                                image_url: ImageUrl { url: url.clone() },
                            },
                        })
                        .collect(),
                ),
            }),
        }
    }
    messages
}

pub struct LLMClient {
    client: Client,
    api_key: String,
    config: LLMConfig,
}

impl LLMClient {
    pub fn new(api_key: String, config: LLMConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key,
            config,
        }
    }

    async fn chat_with_format(
        &self,
        turns: &[Turn],
        response_format: Option<ResponseFormat>,
    ) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: to_wire(turns),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format,
        };
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        const BASE_DELAY_MS: u64 = 500;
        let max_retries = self.config.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..max_retries {
            if attempt > 0 {
                let delay = BASE_DELAY_MS * 2_u64.pow(attempt - 1);
                tracing::warn!(
                    "[LLMClient] Retrying API call (attempt {}/{}) after {}ms delay",
                    attempt + 1,
                    max_retries,
                    delay
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let response = match self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::warn!("[LLMClient] HTTP request failed: {}", e);
                    last_error = Some(format!("HTTP request failed: {}", e));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                tracing::warn!(
                    "[LLMClient] API returned error status {}: {}",
                    status,
                    error_text
                );
                let message = format!("API error {}: {}", status, error_text);
                if !is_retryable(status) {
                    return Err(Error::CompletionFailed(message));
                }
                last_error = Some(message);
                continue;
            }

            let chat_response = match response.json::<ChatResponse>().await {
                Ok(cr) => cr,
                Err(e) => {
                    tracing::warn!("[LLMClient] Failed to decode response body: {}", e);
                    last_error = Some(format!("Response decode error: {}", e));
                    continue;
                }
            };

            return chat_response
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content.unwrap_or_default().trim().to_string())
                .ok_or_else(|| Error::CompletionFailed("response contained no choices".into()));
        }

        Err(Error::CompletionFailed(
            last_error.unwrap_or_else(|| "All retry attempts failed".to_string()),
        ))
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl CompletionClient for LLMClient {
    async fn complete(&self, turns: &[Turn]) -> Result<String> {
        self.chat_with_format(turns, None).await
    }

    async fn complete_json(&self, turns: &[Turn], schema: &JsonSchemaFormat) -> Result<Value> {
        let text = self
            .chat_with_format(
                turns,
                Some(ResponseFormat::JsonSchema {
                    json_schema: schema.clone(),
                }),
            )
            .await?;
        serde_json::from_str(&text)
            .map_err(|e| Error::CompletionFailed(format!("structured response is not JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> LLMConfig {
        LLMConfig {
            model: "gpt-test".to_string(),
            max_tokens: 64,
            temperature: 0.0,
            base_url,
            timeout_secs: 5,
            max_retries: 2,
        }
    }

    fn answer(text: &str) -> Value {
        json!({"choices": [{"message": {"role": "assistant", "content": text}}]})
    }

    #[tokio::test]
    async fn test_complete_returns_trimmed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-test"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer("  Thanks! 🙌 \n")))
            .expect(1)
            .mount(&server)
            .await;

        let client = LLMClient::new("sk-test".to_string(), config(server.uri()));
        let reply = client.complete(&[Turn::user("hi")]).await.unwrap();
        assert_eq!(reply, "Thanks! 🙌");
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let client = LLMClient::new("sk-test".to_string(), config(server.uri()));
        let err = client.complete(&[Turn::user("hi")]).await.unwrap_err();
        assert!(matches!(err, Error::CompletionFailed(ref m) if m.contains("400")));
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .expect(2)
            .mount(&server)
            .await;

        let client = LLMClient::new("sk-test".to_string(), config(server.uri()));
        let err = client.complete(&[Turn::user("hi")]).await.unwrap_err();
        assert!(matches!(err, Error::CompletionFailed(_)));
    }

    #[tokio::test]
    async fn test_structured_non_json_is_completion_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"response_format": {"type": "json_schema"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer("not json")))
            .mount(&server)
            .await;

        let client = LLMClient::new("sk-test".to_string(), config(server.uri()));
        let schema = JsonSchemaFormat {
            name: "ideas".to_string(),
            description: None,
            schema: json!({"type": "object"}),
            strict: true,
        };
        let err = client.complete_json(&[Turn::user("x")], &schema).await.unwrap_err();
        assert!(matches!(err, Error::CompletionFailed(_)));
    }

    #[test]
    fn test_system_images_become_user_message() {
        let turns = vec![Turn::system(Content::Parts(vec![
            ContentPart::Text {
                text: "persona".to_string(),
            },
            ContentPart::Image {
                url: "https://cdn.example/a.jpg".to_string(),
            },
        ]))];

        let wire = serde_json::to_value(to_wire(&turns)).unwrap();
        assert_eq!(wire[0], json!({"role": "system", "content": "persona"}));
        assert_eq!(
            wire[1],
            json!({"role": "user", "content": [
                {"type": "image_url", "image_url": {"url": "https://cdn.example/a.jpg"}}
            ]})
        );
    }
}

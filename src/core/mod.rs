pub mod conversation;
pub mod llm;

pub use conversation::{Content, ContentPart, Conversation, Persona, Role, Turn};
pub use llm::{complete_structured, CompletionClient, JsonSchemaFormat, LLMClient, ResponseFormat};

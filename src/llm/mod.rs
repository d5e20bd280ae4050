// src/llm/mod.rs
//! Language-model provider abstraction. Providers only move text; turning
//! an empty or malformed completion into a domain error is the caller's job.

pub mod mock;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::Settings;

pub use mock::MockLlm;
pub use openai::OpenAiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for a single JSON object.
    pub json_mode: bool,
}

impl CompletionRequest {
    /// Convenience for the system + user pair every stage sends.
    pub fn new(system: &str, user: String) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: 0.7,
            max_tokens: 3000,
            json_mode: false,
        }
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = n;
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    /// Content of the last user message.
    pub fn user_prompt(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Return the completion text. An empty string is a valid (if useless)
    /// answer; transport and status failures are errors.
    async fn complete(&self, req: &CompletionRequest) -> anyhow::Result<String>;
    fn provider_name(&self) -> &'static str;
}

pub type DynLlm = Arc<dyn LlmClient>;

/// Factory: `LLM_TEST_MODE=mock` gives the offline mock, anything else the
/// OpenAI-compatible provider.
pub fn build_llm_client(settings: &Settings) -> anyhow::Result<DynLlm> {
    if settings.llm_mock_mode() {
        tracing::warn!("LLM_TEST_MODE=mock: using the deterministic mock model");
        return Ok(Arc::new(MockLlm::default()));
    }
    Ok(Arc::new(OpenAiClient::new(settings)?))
}

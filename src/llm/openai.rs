// src/llm/openai.rs
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, CompletionRequest, LlmClient};
use crate::config::Settings;

/// OpenAI-compatible Chat Completions provider.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_completion_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("column-forge/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(settings.http_timeout())
            .build()
            .context("building chat completions http client")?;
        Ok(Self {
            http,
            api_key: settings.openai_api_key.clone(),
            model: settings.openai_model.clone(),
            base_url: settings.openai_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, req: &CompletionRequest) -> anyhow::Result<String> {
        if self.api_key.is_empty() {
            bail!("OPENAI_API_KEY is not configured");
        }

        let body = Req {
            model: &self.model,
            messages: &req.messages,
            temperature: req.temperature,
            max_completion_tokens: req.max_tokens,
            response_format: req.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        tracing::debug!(model = %self.model, json_mode = req.json_mode, "chat completion request");

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("chat completion timed out")
                } else {
                    anyhow!("chat completion request failed: {e}")
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!(
                "chat completion error ({status}): {}",
                crate::text::preview(&text, 200)
            );
        }

        let parsed: Resp = resp.json().await.context("decoding chat completion")?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

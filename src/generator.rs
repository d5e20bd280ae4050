// src/generator.rs
use metrics::counter;

use crate::error::{ColumnError, Result};
use crate::llm::{CompletionRequest, DynLlm};
use crate::models::{NewsItem, Source, DEFAULT_SUMMARY, DEFAULT_TITLE, SUMMARY_MAX_CHARS};
use crate::prompts::{build_draft_prompt, DRAFT_SYSTEM_PROMPT};
use crate::text::truncate_with_ellipsis;

const DRAFT_TEMPERATURE: f32 = 0.7;
const DRAFT_MAX_TOKENS: u32 = 3000;

/// Section headings that are never the article title.
const RESERVED_HEADINGS: [&str; 3] = ["## 💬", "## 🧨", "## 📌"];

/// Drafts columns with one model call and parses title/summary out of them.
#[derive(Clone)]
pub struct ContentGenerator {
    llm: DynLlm,
}

impl ContentGenerator {
    pub fn new(llm: DynLlm) -> Self {
        Self { llm }
    }

    pub fn provider_name(&self) -> &'static str {
        self.llm.provider_name()
    }

    /// One model call; the completion is returned as-is.
    pub async fn draft_from_news(
        &self,
        topic: &str,
        news: &[NewsItem],
        sources: &[Source],
    ) -> Result<String> {
        let prompt = build_draft_prompt(topic, news, sources);
        let req = CompletionRequest::new(DRAFT_SYSTEM_PROMPT, prompt)
            .temperature(DRAFT_TEMPERATURE)
            .max_tokens(DRAFT_MAX_TOKENS);

        counter!("column_drafts_total").increment(1);
        let text = self.llm.complete(&req).await.map_err(|e| {
            tracing::error!(error = %e, provider = self.llm.provider_name(), "draft call failed");
            ColumnError::generation(format!("column drafting failed: {e}"))
        })?;

        if text.trim().is_empty() {
            return Err(ColumnError::generation("the model returned an empty draft"));
        }
        tracing::info!(chars = text.chars().count(), items = news.len(), "draft generated");
        Ok(text)
    }
}

/// Title is the first `## ` heading that is not a reserved section; the
/// summary is the first non-empty, non-heading line after it.
pub fn extract_title_and_summary(content: &str) -> (String, String) {
    let lines: Vec<&str> = content.lines().map(str::trim).collect();

    let title_at = lines.iter().position(|l| {
        l.starts_with("## ") && !RESERVED_HEADINGS.iter().any(|r| l.starts_with(r))
    });

    let Some(idx) = title_at else {
        return (DEFAULT_TITLE.to_string(), DEFAULT_SUMMARY.to_string());
    };

    let title = lines[idx][3..].trim();
    let title = if title.is_empty() { DEFAULT_TITLE } else { title };

    let summary = lines[idx + 1..]
        .iter()
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| truncate_with_ellipsis(l, SUMMARY_MAX_CHARS))
        .unwrap_or_else(|| DEFAULT_SUMMARY.to_string());

    (title.to_string(), summary)
}

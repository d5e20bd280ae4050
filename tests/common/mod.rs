// Shared in-process fakes for the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use column_forge::cache::{InMemoryPreviewStore, PreviewStore};
use column_forge::error::{ColumnError, Result};
use column_forge::llm::{CompletionRequest, LlmClient};
use column_forge::models::{NewsItem, PublishedAt};
use column_forge::news::{NewsSearch, SearchQuery};
use column_forge::pipeline::ColumnPipeline;

pub struct FakeNews {
    pub items: Vec<NewsItem>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl FakeNews {
    pub fn with(items: Vec<NewsItem>) -> Arc<Self> {
        Arc::new(Self {
            items,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            items: vec![],
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsSearch for FakeNews {
    async fn search(&self, _q: &SearchQuery) -> Result<Vec<NewsItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ColumnError::NewsSearch("news search provider returned 500".into()));
        }
        Ok(self.items.clone())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Drafts a fixed column; evaluations walk through `scores`, repeating the
/// last entry. Evaluation n revises to "Revised column number n".
pub struct FakeLlm {
    pub scores: Vec<f64>,
    pub reported_pass: Option<bool>,
    pub drafts: AtomicUsize,
    pub evaluations: AtomicUsize,
    pub fail_evaluation: bool,
    pub last_draft_prompt: Mutex<String>,
}

impl FakeLlm {
    pub fn new(scores: Vec<f64>) -> Self {
        Self {
            scores,
            reported_pass: None,
            drafts: AtomicUsize::new(0),
            evaluations: AtomicUsize::new(0),
            fail_evaluation: false,
            last_draft_prompt: Mutex::new(String::new()),
        }
    }

    pub fn arc(scores: Vec<f64>) -> Arc<Self> {
        Arc::new(Self::new(scores))
    }

    pub fn drafts(&self) -> usize {
        self.drafts.load(Ordering::SeqCst)
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

pub fn sample_column(title: &str) -> String {
    format!(
        "## {title}\n\nA short summary of where the debate stands today.\n\n\
         ## 💬 Positions\n\n### 🔵 Progressive position\n- a\n- b\n- c\n\n\
         ### 🔴 Conservative position\n- a\n- b\n- c\n\n## 📌 Conclusion\n\nIt continues.\n"
    )
}

fn revision(n: usize) -> String {
    format!("## Revised column number {n}\n\nRevision {n} summary line.\n\n{}", "body ".repeat(30))
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn complete(&self, req: &CompletionRequest) -> anyhow::Result<String> {
        if !req.json_mode {
            self.drafts.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut p) = self.last_draft_prompt.lock() {
                *p = req.user_prompt().to_string();
            }
            return Ok(sample_column("Budget fight heads to the floor"));
        }
        if self.fail_evaluation {
            anyhow::bail!("upstream 502");
        }
        let n = self.evaluations.fetch_add(1, Ordering::SeqCst);
        let s = *self
            .scores
            .get(n)
            .or_else(|| self.scores.last())
            .unwrap_or(&0.0);
        let pass = self.reported_pass.unwrap_or(s >= 85.0);
        Ok(serde_json::json!({
            "scores": {
                "format": s, "balance": s, "readability": s,
                "completeness": s, "objectivity": s
            },
            "pass": pass,
            "feedback": if pass { "Well balanced." } else { "Add more detail." },
            "revisedContent": revision(n + 1),
        })
        .to_string())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

pub fn news_item(title: &str, i: usize) -> NewsItem {
    NewsItem {
        title: title.to_string(),
        description: format!("Lawmakers argued over {title}."),
        published_at: PublishedAt::Parsed((Utc::now() - Duration::hours(i as i64)).fixed_offset()),
        original_link: format!("https://publisher.example/{i}"),
        fetch_link: format!("https://portal.example/{i}"),
    }
}

pub fn news(n: usize) -> Vec<NewsItem> {
    (0..n)
        .map(|i| news_item(&format!("economic policy debate heats up {i}"), i))
        .collect()
}

pub fn store() -> Arc<dyn PreviewStore> {
    Arc::new(InMemoryPreviewStore::new(std::time::Duration::from_secs(600)))
}

pub fn pipeline(news: Arc<FakeNews>, llm: Arc<FakeLlm>) -> ColumnPipeline {
    ColumnPipeline::new(news, llm, store())
}

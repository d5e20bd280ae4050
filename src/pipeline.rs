// src/pipeline.rs
//! Orchestrator: search, draft, bounded evaluate/revise loop, extract,
//! assemble. Each request runs the chain sequentially; the preview store is
//! the only state shared between requests.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, histogram};
use serde::Serialize;

use crate::cache::{CacheEntry, CacheKey, PreviewStore};
use crate::error::{ColumnError, Result};
use crate::evaluator::{ContentEvaluator, QualityReport};
use crate::generator::{extract_title_and_summary, ContentGenerator};
use crate::llm::DynLlm;
use crate::models::{
    iso_now, ColumnParams, EvaluationResult, GeneratedArticle, NewsItem, QualityTier, SearchMode,
    Source,
};
use crate::news::{to_sources, NewsSearch, SearchQuery};
use crate::text::{preview, topic_id};

/// Items returned by a preview.
pub const PREVIEW_ITEMS: usize = 5;

#[derive(Debug, Clone)]
pub struct NewsPreview {
    pub topic: String,
    pub days_back: u32,
    pub search_mode: SearchMode,
    /// Up to [`PREVIEW_ITEMS`] newest items.
    pub items: Vec<NewsItem>,
    pub total_count: usize,
    pub quality_tier: QualityTier,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub llm_provider: &'static str,
    pub content_generation: bool,
    pub content_evaluation: bool,
    pub news_search: bool,
    pub news_provider: &'static str,
    pub preview_cache_entries: usize,
    pub timestamp: String,
}

#[derive(Clone)]
pub struct ColumnPipeline {
    news: Arc<dyn NewsSearch>,
    generator: ContentGenerator,
    evaluator: ContentEvaluator,
    store: Arc<dyn PreviewStore>,
}

impl ColumnPipeline {
    pub fn new(news: Arc<dyn NewsSearch>, llm: DynLlm, store: Arc<dyn PreviewStore>) -> Self {
        Self {
            news,
            generator: ContentGenerator::new(llm.clone()),
            evaluator: ContentEvaluator::new(llm),
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn PreviewStore> {
        &self.store
    }

    /// Search failures here mean "no news"; the caller decides what that
    /// is worth.
    async fn search_or_empty(&self, topic: &str, days_back: u32, mode: SearchMode) -> Vec<NewsItem> {
        let q = SearchQuery::new(topic, days_back, mode);
        match self.news.search(&q).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(error = %e, provider = self.news.name(), "news search failed, continuing without news");
                Vec::new()
            }
        }
    }

    /// Full bounded pipeline. Zero news is a hard failure.
    pub async fn generate_column(&self, p: &ColumnParams) -> Result<GeneratedArticle> {
        let t0 = Instant::now();
        let tid = topic_id(&p.topic);
        tracing::info!(
            topic_id = %tid,
            max_attempts = p.max_revision_attempts,
            days_back = p.days_back,
            mode = p.search_mode.as_str(),
            "column generation started"
        );

        let news = self.search_or_empty(&p.topic, p.days_back, p.search_mode).await;
        if news.is_empty() {
            counter!("column_generation_failures_total", "reason" => "no_news").increment(1);
            tracing::error!(topic_id = %tid, "no news found, refusing to write an ungrounded column");
            return Err(ColumnError::generation(format!(
                "no news found for '{}'; a fact-based column cannot be written",
                p.topic
            )));
        }
        let sources = to_sources(&news);

        let out = self
            .generate_with_news(&p.topic, &news, sources, p.max_revision_attempts)
            .await;
        record_duration("full", t0);
        out
    }

    /// Draft from already-collected news, then revise and assemble.
    pub async fn generate_with_news(
        &self,
        topic: &str,
        news: &[NewsItem],
        sources: Vec<Source>,
        max_attempts: u32,
    ) -> Result<GeneratedArticle> {
        if news.is_empty() {
            return Err(ColumnError::generation(format!(
                "no news available for '{topic}'; a fact-based column cannot be written"
            )));
        }
        let draft = self.generator.draft_from_news(topic, news, &sources).await?;
        let (content, last) = self.revise(draft, max_attempts).await?;
        if let Some(ev) = &last {
            if !ev.passed {
                tracing::warn!(
                    attempts = max_attempts,
                    average = ev.scores.average(),
                    "revision budget exhausted, keeping the last revision"
                );
            }
        }
        let article = assemble(content, sources)?;
        counter!("column_generations_total").increment(1);
        tracing::info!(
            title_chars = article.title.chars().count(),
            sources = article.sources.len(),
            word_count = article.word_count(),
            "column assembled"
        );
        Ok(article)
    }

    /// At most `max_attempts` evaluations. A pass stops the loop; otherwise
    /// the revision becomes the next input. Returns the final content and
    /// the last evaluation.
    pub async fn revise(
        &self,
        mut content: String,
        max_attempts: u32,
    ) -> Result<(String, Option<EvaluationResult>)> {
        let mut last = None;
        for attempt in 1..=max_attempts {
            let ev = self.evaluator.evaluate_and_revise(&content).await?;
            tracing::info!(attempt, max_attempts, passed = ev.passed, "evaluation attempt");
            if ev.passed {
                return Ok((content, Some(ev)));
            }
            tracing::info!(attempt, feedback = %preview(&ev.feedback, 100), "revising");
            content = ev.revised_content.clone();
            last = Some(ev);
        }
        Ok((content, last))
    }

    /// Legacy single call: one draft, no evaluation. Search failures and
    /// zero news degrade to an article with empty sources.
    pub async fn generate_single_shot(&self, topic: &str) -> Result<GeneratedArticle> {
        let t0 = Instant::now();
        let news = self
            .search_or_empty(topic, crate::models::DEFAULT_DAYS_BACK, SearchMode::Title)
            .await;
        if news.is_empty() {
            tracing::warn!(topic_id = %topic_id(topic), "single-shot generation without news");
        }
        let sources = to_sources(&news);
        let draft = self.generator.draft_from_news(topic, &news, &sources).await?;
        let article = assemble(draft, sources)?;
        counter!("column_generations_total").increment(1);
        record_duration("single_shot", t0);
        Ok(article)
    }

    /// Search and park the result for a later confirm. Search failures
    /// propagate; only non-empty results are cached.
    pub async fn preview(&self, topic: &str, days_back: u32, mode: SearchMode) -> Result<NewsPreview> {
        let q = SearchQuery::new(topic, days_back, mode);
        let news = self.news.search(&q).await?;
        let total = news.len();
        let tier = QualityTier::from_count(total);

        let items: Vec<NewsItem> = news.iter().take(PREVIEW_ITEMS).cloned().collect();
        if total > 0 {
            let sources = to_sources(&news);
            self.store.insert(
                CacheKey::new(topic, days_back, mode),
                CacheEntry {
                    news_items: news,
                    sources,
                    timestamp: Utc::now(),
                },
            );
        }
        tracing::info!(
            topic_id = %topic_id(topic),
            items = total,
            tier = tier.as_str(),
            "news preview ready"
        );

        Ok(NewsPreview {
            topic: topic.to_string(),
            days_back,
            search_mode: mode,
            items,
            total_count: total,
            quality_tier: tier,
            recommendation: tier.recommendation(total),
        })
    }

    /// Second half of preview/confirm. A cached preview is consumed (no
    /// second search); without one the full pipeline runs.
    pub async fn confirm(&self, p: &ColumnParams, proceed: bool) -> Result<GeneratedArticle> {
        if !proceed {
            tracing::info!(topic_id = %topic_id(&p.topic), "generation cancelled by user");
            return Err(ColumnError::UserCancelled);
        }
        let key = CacheKey::new(&p.topic, p.days_back, p.search_mode);
        match self.store.take(&key, Utc::now()) {
            Some(entry) => {
                tracing::info!(items = entry.news_items.len(), "using cached preview");
                let t0 = Instant::now();
                let out = self
                    .generate_with_news(
                        &p.topic,
                        &entry.news_items,
                        entry.sources,
                        p.max_revision_attempts,
                    )
                    .await;
                record_duration("confirmed", t0);
                out
            }
            None => {
                tracing::info!("no cached preview, searching again");
                self.generate_column(p).await
            }
        }
    }

    /// Score arbitrary content without keeping the revision.
    pub async fn quality_metrics(&self, content: &str) -> Result<QualityReport> {
        let ev = self.evaluator.evaluate_and_revise(content).await?;
        let report = QualityReport::from_scores(ev.scores);
        tracing::info!(grade = report.grade.as_str(), average = report.average_score, "quality report");
        Ok(report)
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            llm_provider: self.generator.provider_name(),
            content_generation: true,
            content_evaluation: true,
            news_search: self.news.enabled(),
            news_provider: self.news.name(),
            preview_cache_entries: self.store.len(),
            timestamp: iso_now(),
        }
    }
}

fn assemble(content: String, sources: Vec<Source>) -> Result<GeneratedArticle> {
    let (title, summary) = extract_title_and_summary(&content);
    GeneratedArticle::assemble(title, summary, content, sources)
}

fn record_duration(path: &'static str, t0: Instant) {
    histogram!("column_pipeline_ms", "path" => path).record(t0.elapsed().as_secs_f64() * 1_000.0);
}

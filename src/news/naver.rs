// src/news/naver.rs
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use super::filter::{optimize_query, process_items};
use super::{NewsSearch, SearchQuery, MAX_RESULTS_CAP};
use crate::config::{NewsFilterConfig, Settings};
use crate::error::{ColumnError, Result};
use crate::models::NewsItem;
use crate::text::topic_id;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// Naver news search API client. One GET per search, never retried.
pub struct NaverNewsClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    filter: Arc<NewsFilterConfig>,
}

impl NaverNewsClient {
    pub fn new(settings: &Settings, filter: Arc<NewsFilterConfig>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("column-forge/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(settings.http_timeout())
            .build()
            .context("building news search http client")?;
        Ok(Self {
            http,
            base_url: settings.naver_base_url.clone(),
            client_id: settings.naver_client_id.clone(),
            client_secret: settings.naver_client_secret.clone(),
            filter,
        })
    }

    async fn fetch_raw(&self, query: &str, q: &SearchQuery) -> Result<Vec<serde_json::Value>> {
        let display = q.max_results.clamp(1, MAX_RESULTS_CAP).to_string();
        let resp = self
            .http
            .get(&self.base_url)
            .header("X-Naver-Client-Id", &self.client_id)
            .header("X-Naver-Client-Secret", &self.client_secret)
            .query(&[
                ("query", query),
                ("display", display.as_str()),
                ("start", "1"),
                ("sort", q.sort.provider_param()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ColumnError::NewsSearch("news search timed out".to_string())
                } else {
                    ColumnError::NewsSearch(format!("news search request failed: {e}"))
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ColumnError::NewsSearch(format!(
                "news search provider returned {status}"
            )));
        }

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| ColumnError::NewsSearch(format!("unreadable news search response: {e}")))?;
        Ok(body.items)
    }
}

#[async_trait]
impl NewsSearch for NaverNewsClient {
    async fn search(&self, q: &SearchQuery) -> Result<Vec<NewsItem>> {
        let t0 = Instant::now();
        let query = optimize_query(&q.topic, &self.filter);
        tracing::info!(
            topic_id = %topic_id(&q.topic),
            days_back = q.days_back,
            mode = q.mode.as_str(),
            "news search started"
        );
        counter!("news_search_total").increment(1);

        let raw = match self.fetch_raw(&query, q).await {
            Ok(raw) => raw,
            Err(e) => {
                counter!("news_search_errors_total").increment(1);
                tracing::error!(error = %e, "news search failed");
                return Err(e);
            }
        };

        let (items, stats) = process_items(
            raw,
            &q.topic,
            q.days_back,
            q.mode,
            &self.filter,
            chrono::Utc::now(),
        );

        histogram!("news_search_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("news_items_kept_total").increment(stats.kept as u64);
        tracing::info!(
            received = stats.received,
            kept = stats.kept,
            stale = stats.stale,
            off_topic = stats.off_topic,
            title_miss = stats.title_miss,
            malformed = stats.malformed,
            "news search finished"
        );
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "naver"
    }
}

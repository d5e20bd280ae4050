// src/news/mod.rs
pub mod filter;
pub mod naver;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{collect_sources, NewsItem, SearchMode, SortOrder, Source, SourceRef};

pub use filter::{optimize_query, process_items, FilterStats, RawNewsRecord};
pub use naver::NaverNewsClient;

/// Provider cap on results per request.
pub const MAX_RESULTS_CAP: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub topic: String,
    pub max_results: u32,
    pub days_back: u32,
    pub sort: SortOrder,
    pub mode: SearchMode,
}

impl SearchQuery {
    pub fn new(topic: impl Into<String>, days_back: u32, mode: SearchMode) -> Self {
        Self {
            topic: topic.into(),
            max_results: 20,
            days_back,
            sort: SortOrder::Date,
            mode,
        }
    }
}

/// A news-search backend. Implementations return items already sanitized,
/// filtered and ordered newest first.
#[async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<NewsItem>>;
    fn name(&self) -> &'static str;
    fn enabled(&self) -> bool {
        true
    }
}

/// Used when no provider credentials are configured; always finds nothing.
pub struct DisabledNewsSearch;

#[async_trait]
impl NewsSearch for DisabledNewsSearch {
    async fn search(&self, _query: &SearchQuery) -> Result<Vec<NewsItem>> {
        tracing::warn!("news search is disabled; returning no items");
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "disabled"
    }

    fn enabled(&self) -> bool {
        false
    }
}

/// Citation list for a set of news items, order preserved.
pub fn to_sources(items: &[NewsItem]) -> Vec<Source> {
    collect_sources(items.iter().map(SourceRef::News))
}

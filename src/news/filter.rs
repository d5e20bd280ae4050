// src/news/filter.rs
//! Pure post-processing of provider records: sanitize, date window,
//! political relevance, title match, ordering.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Deserialize;

use crate::config::NewsFilterConfig;
use crate::models::{newest_first, NewsItem, PublishedAt, SearchMode};
use crate::text::sanitize_text;

/// One record as the provider returns it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNewsRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default, rename = "originallink")]
    pub original_link: String,
    #[serde(default, rename = "pubDate")]
    pub pub_date: String,
}

/// Counters describing one filtering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub received: usize,
    pub malformed: usize,
    pub stale: usize,
    pub off_topic: usize,
    pub title_miss: usize,
    pub kept: usize,
}

/// Expand known entities and make sure the query carries political context.
pub fn optimize_query(topic: &str, cfg: &NewsFilterConfig) -> String {
    let mut optimized = topic.to_string();
    for e in &cfg.expansions {
        if topic.contains(e.keyword.as_str()) {
            optimized = optimized.replace(e.keyword.as_str(), e.expanded.as_str());
        }
    }

    let lower = optimized.to_lowercase();
    let has_context = cfg.context_terms.iter().any(|t| lower.contains(t.as_str()));
    if !has_context && !cfg.generic_term.is_empty() {
        optimized.push(' ');
        optimized.push_str(&cfg.generic_term);
    }
    tracing::debug!(query = %optimized, "query optimized");
    optimized
}

/// Provider date format, e.g. `Tue, 03 Sep 2024 10:30:00 +0900`.
pub fn parse_provider_date(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(s.trim()).ok()
}

pub fn is_political(title: &str, description: &str, cfg: &NewsFilterConfig) -> bool {
    let text = format!("{title} {description}").to_lowercase();
    cfg.vocabulary.iter().any(|kw| mentions(&text, kw))
}

/// ASCII terms match whole words, with an optional plural "s", so "bill"
/// does not fire on "billion". Other scripts match as substrings since
/// Korean particles attach directly to the noun.
fn mentions(text: &str, term: &str) -> bool {
    if !term.is_ascii() {
        return text.contains(term);
    }
    text.match_indices(term).any(|(i, _)| {
        let before = text[..i].chars().next_back();
        let mut after = text[i + term.len()..].chars();
        let next = match after.next() {
            Some('s') => after.next(),
            other => other,
        };
        !before.is_some_and(char::is_alphanumeric) && !next.is_some_and(char::is_alphanumeric)
    })
}

/// Every whitespace-separated topic token must occur in the title.
pub fn title_matches_topic(title: &str, topic: &str) -> bool {
    let title = title.to_lowercase();
    topic
        .split_whitespace()
        .all(|tok| title.contains(tok.to_lowercase().as_str()))
}

/// Run the filter pipeline over raw provider JSON records. Records that do
/// not deserialize are dropped and counted, never fatal.
pub fn process_items(
    raw: Vec<serde_json::Value>,
    topic: &str,
    days_back: u32,
    mode: SearchMode,
    cfg: &NewsFilterConfig,
    now: DateTime<Utc>,
) -> (Vec<NewsItem>, FilterStats) {
    let cutoff = now - Duration::days(i64::from(days_back));
    let mut stats = FilterStats {
        received: raw.len(),
        ..FilterStats::default()
    };
    let mut out = Vec::with_capacity(raw.len());

    for value in raw {
        let rec: RawNewsRecord = match serde_json::from_value(value) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed news record");
                stats.malformed += 1;
                continue;
            }
        };

        let title = sanitize_text(&rec.title);
        let description = sanitize_text(&rec.description);

        let published_at = match parse_provider_date(&rec.pub_date) {
            Some(dt) if dt < cutoff => {
                stats.stale += 1;
                continue;
            }
            Some(dt) => PublishedAt::Parsed(dt),
            None => {
                tracing::debug!(raw = %rec.pub_date, "unparseable publish date kept verbatim");
                PublishedAt::Raw(rec.pub_date.clone())
            }
        };

        if !is_political(&title, &description, cfg) {
            stats.off_topic += 1;
            continue;
        }

        if mode == SearchMode::Title && !title_matches_topic(&title, topic) {
            stats.title_miss += 1;
            continue;
        }

        out.push(NewsItem {
            title,
            description,
            published_at,
            original_link: rec.original_link,
            fetch_link: rec.link,
        });
    }

    out.sort_by(|a, b| newest_first(&a.published_at, &b.published_at));
    stats.kept = out.len();
    (out, stats)
}

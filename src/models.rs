// src/models.rs
//! Domain data shared by the pipeline stages, plus request validation.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{ColumnError, Result};
use crate::text::truncate_with_ellipsis;

pub const PASS_THRESHOLD: f64 = 85.0;
pub const SUMMARY_MAX_CHARS: usize = 300;
pub const TITLE_MIN_CHARS: usize = 5;
pub const TITLE_MAX_CHARS: usize = 100;
pub const CONTENT_MIN_CHARS: usize = 100;
pub const DEFAULT_TITLE: &str = "Untitled Column";
pub const DEFAULT_SUMMARY: &str = "A balanced look at a current political issue.";

/// Topics containing any of these are rejected before any network call.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "욕설",
    "혐오",
    "비방",
    "개인정보",
    "profanity",
    "hate speech",
    "slander",
    "personal information",
];

/// UTC timestamp in ISO 8601 with a trailing `Z`.
pub fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/* ----------------------------
News items & sources
---------------------------- */

/// Publish date of a news item. Provider dates that fail to parse are kept
/// verbatim instead of dropping the item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishedAt {
    Parsed(DateTime<FixedOffset>),
    Raw(String),
}

impl PublishedAt {
    pub fn as_parsed(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Self::Parsed(dt) => Some(dt),
            Self::Raw(_) => None,
        }
    }
}

impl fmt::Display for PublishedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Raw(s) => f.write_str(s),
        }
    }
}

impl Serialize for PublishedAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Newest first. Parsed dates rank ahead of raw strings; raw strings
/// compare lexically among themselves.
pub fn newest_first(a: &PublishedAt, b: &PublishedAt) -> Ordering {
    match (a, b) {
        (PublishedAt::Parsed(x), PublishedAt::Parsed(y)) => y.cmp(x),
        (PublishedAt::Parsed(_), PublishedAt::Raw(_)) => Ordering::Less,
        (PublishedAt::Raw(_), PublishedAt::Parsed(_)) => Ordering::Greater,
        (PublishedAt::Raw(x), PublishedAt::Raw(y)) => y.cmp(x),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub description: String,
    pub published_at: PublishedAt,
    pub original_link: String,
    /// Provider-hosted copy of the article.
    pub fetch_link: String,
}

impl NewsItem {
    /// Publisher link when known, provider link otherwise.
    pub fn link(&self) -> &str {
        if self.original_link.is_empty() {
            &self.fetch_link
        } else {
            &self.original_link
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

/// The two shapes citations arrive in: a loose key/value record or a typed
/// news item.
#[derive(Debug, Clone, Copy)]
pub enum SourceRef<'a> {
    Record(&'a serde_json::Value),
    News(&'a NewsItem),
}

impl Source {
    /// Canonicalize a citation. Records may name the URI `uri`, `link`,
    /// `originalLink` or `url`. Entries without a title or URI are skipped.
    pub fn from_ref(r: SourceRef<'_>) -> Option<Self> {
        let (title, uri) = match r {
            SourceRef::News(item) => (item.title.trim(), item.link().trim()),
            SourceRef::Record(v) => {
                let obj = v.as_object()?;
                let title = obj.get("title").and_then(|t| t.as_str())?;
                let uri = ["uri", "originalLink", "link", "url"]
                    .iter()
                    .filter_map(|k| obj.get(*k).and_then(|u| u.as_str()))
                    .find(|u| !u.trim().is_empty())?;
                (title.trim(), uri.trim())
            }
        };
        if title.is_empty() || uri.is_empty() {
            return None;
        }
        Some(Self {
            title: title.to_string(),
            uri: uri.to_string(),
        })
    }
}

/// One source per convertible entry, order preserved.
pub fn collect_sources<'a, I>(refs: I) -> Vec<Source>
where
    I: IntoIterator<Item = SourceRef<'a>>,
{
    let out: Vec<Source> = refs.into_iter().filter_map(Source::from_ref).collect();
    tracing::debug!(sources = out.len(), "sources collected");
    out
}

/* ----------------------------
Evaluation
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Format,
    Balance,
    Readability,
    Completeness,
    Objectivity,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Self::Format,
        Self::Balance,
        Self::Readability,
        Self::Completeness,
        Self::Objectivity,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Format => "format",
            Self::Balance => "balance",
            Self::Readability => "readability",
            Self::Completeness => "completeness",
            Self::Objectivity => "objectivity",
        }
    }
}

/// Rubric scores, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub format: f64,
    pub balance: f64,
    pub readability: f64,
    pub completeness: f64,
    pub objectivity: f64,
}

impl Scores {
    pub fn uniform(v: f64) -> Self {
        Self {
            format: v,
            balance: v,
            readability: v,
            completeness: v,
            objectivity: v,
        }
    }

    pub fn get(&self, d: Dimension) -> f64 {
        match d {
            Dimension::Format => self.format,
            Dimension::Balance => self.balance,
            Dimension::Readability => self.readability,
            Dimension::Completeness => self.completeness,
            Dimension::Objectivity => self.objectivity,
        }
    }

    pub fn set(&mut self, d: Dimension, v: f64) {
        let slot = match d {
            Dimension::Format => &mut self.format,
            Dimension::Balance => &mut self.balance,
            Dimension::Readability => &mut self.readability,
            Dimension::Completeness => &mut self.completeness,
            Dimension::Objectivity => &mut self.objectivity,
        };
        *slot = v;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f64)> + '_ {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }

    pub fn all_passing(&self) -> bool {
        self.iter().all(|(_, s)| s >= PASS_THRESHOLD)
    }

    pub fn average(&self) -> f64 {
        self.iter().map(|(_, s)| s).sum::<f64>() / Dimension::ALL.len() as f64
    }

    /// Lowest-scoring dimension; ties resolve to rubric order.
    pub fn weakest(&self) -> (Dimension, f64) {
        self.iter()
            .fold((Dimension::Format, f64::INFINITY), |acc, cur| {
                if cur.1 < acc.1 {
                    cur
                } else {
                    acc
                }
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub scores: Scores,
    /// Derived from `scores`; the model's own verdict is kept separately.
    pub passed: bool,
    pub reported_pass: bool,
    pub feedback: String,
    pub revised_content: String,
}

impl EvaluationResult {
    pub fn new(scores: Scores, reported_pass: bool, feedback: String, revised: String) -> Self {
        Self {
            passed: scores.all_passing(),
            scores,
            reported_pass,
            feedback,
            revised_content: revised,
        }
    }
}

/* ----------------------------
Article
---------------------------- */

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedArticle {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub sources: Vec<Source>,
}

impl GeneratedArticle {
    /// Assemble the final article, enforcing the title and summary bounds.
    /// Content shorter than [`CONTENT_MIN_CHARS`] is treated as a malformed
    /// model response.
    pub fn assemble(
        title: String,
        summary: String,
        content: String,
        sources: Vec<Source>,
    ) -> Result<Self> {
        let content_len = content.trim().chars().count();
        if content_len < CONTENT_MIN_CHARS {
            return Err(ColumnError::generation(format!(
                "generated column is too short ({content_len} chars, need {CONTENT_MIN_CHARS})"
            )));
        }

        let title = title.trim();
        let title = if title.chars().count() < TITLE_MIN_CHARS {
            DEFAULT_TITLE.to_string()
        } else {
            truncate_with_ellipsis(title, TITLE_MAX_CHARS)
        };

        Ok(Self {
            title,
            summary: truncate_with_ellipsis(summary.trim(), SUMMARY_MAX_CHARS),
            content,
            sources,
        })
    }

    /// Characters excluding spaces.
    pub fn word_count(&self) -> usize {
        self.content.chars().filter(|c| *c != ' ').count()
    }
}

/* ----------------------------
Search parameters
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Every topic token must appear in the headline.
    #[default]
    Title,
    All,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::All => "all",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "title" => Ok(Self::Title),
            "all" => Ok(Self::All),
            other => Err(ColumnError::validation(
                "searchMode",
                format!("searchMode must be 'title' or 'all', got '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Date,
    Relevance,
}

impl SortOrder {
    /// Value the news provider expects.
    pub fn provider_param(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Relevance => "sim",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl QualityTier {
    pub fn from_count(n: usize) -> Self {
        match n {
            n if n >= 10 => Self::Excellent,
            n if n >= 5 => Self::Good,
            n if n >= 2 => Self::Fair,
            _ => Self::Poor,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }

    pub fn recommendation(self, count: usize) -> String {
        match self {
            Self::Excellent => format!(
                "Found {count} related articles. Coverage is rich enough for a well-grounded column."
            ),
            Self::Good => format!(
                "Found {count} related articles. Coverage is sufficient for a balanced column."
            ),
            Self::Fair => format!(
                "Found only {count} related articles. The column may lack depth; consider widening the search period."
            ),
            Self::Poor if count == 0 => "No related articles were found. Try a broader topic, a longer search period, or searchMode 'all'.".to_string(),
            Self::Poor => format!(
                "Found only {count} related article. Generating now is not recommended; try a broader topic or a longer search period."
            ),
        }
    }
}

/* ----------------------------
Validated request parameters
---------------------------- */

pub const MIN_TOPIC_CHARS: usize = 2;
pub const MAX_TOPIC_CHARS: usize = 200;
pub const DEFAULT_DAYS_BACK: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnParams {
    pub topic: String,
    pub max_revision_attempts: u32,
    pub days_back: u32,
    pub search_mode: SearchMode,
}

impl ColumnParams {
    /// Validate raw caller input. `None` fields take their defaults.
    pub fn validate(
        topic: &str,
        max_revision_attempts: Option<u32>,
        days_back: Option<u32>,
        search_mode: Option<&str>,
        default_attempts: u32,
    ) -> Result<Self> {
        let topic = validate_topic(topic)?;

        let max_revision_attempts = max_revision_attempts.unwrap_or(default_attempts);
        if !(1..=5).contains(&max_revision_attempts) {
            return Err(ColumnError::validation(
                "maxRevisionAttempts",
                "maxRevisionAttempts must be between 1 and 5",
            ));
        }

        let days_back = days_back.unwrap_or(DEFAULT_DAYS_BACK);
        if !(1..=30).contains(&days_back) {
            return Err(ColumnError::validation(
                "daysBack",
                "daysBack must be between 1 and 30",
            ));
        }

        let search_mode = match search_mode {
            Some(s) => SearchMode::parse(s)?,
            None => SearchMode::default(),
        };

        Ok(Self {
            topic,
            max_revision_attempts,
            days_back,
            search_mode,
        })
    }
}

/// Trim, length-check and screen a topic.
pub fn validate_topic(raw: &str) -> Result<String> {
    let topic = raw.trim();
    if topic.is_empty() {
        return Err(ColumnError::validation("topic", "topic must not be blank"));
    }
    let n = topic.chars().count();
    if !(MIN_TOPIC_CHARS..=MAX_TOPIC_CHARS).contains(&n) {
        return Err(ColumnError::validation(
            "topic",
            format!("topic must be {MIN_TOPIC_CHARS}-{MAX_TOPIC_CHARS} characters, got {n}"),
        ));
    }
    let lower = topic.to_lowercase();
    if let Some(kw) = FORBIDDEN_KEYWORDS.iter().find(|kw| lower.contains(*kw)) {
        return Err(ColumnError::validation(
            "topic",
            format!("topic contains inappropriate content: {kw}"),
        ));
    }
    Ok(topic.to_string())
}

// src/config/news_filter.rs
//! Vocabulary driving query augmentation and the political relevance filter.
//! Ships with built-in defaults; a TOML or JSON file can replace them.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_NEWS_FILTER_PATH: &str = "NEWS_FILTER_CONFIG_PATH";
pub const DEFAULT_NEWS_FILTER_PATH: &str = "config/news_filter.toml";

/// A known entity and the phrase it is expanded to in the outgoing query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryExpansion {
    pub keyword: String,
    pub expanded: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewsFilterConfig {
    /// Applied in order, each as a plain substring replacement.
    #[serde(default)]
    pub expansions: Vec<QueryExpansion>,
    /// If none of these appear in the (expanded) query, `generic_term` is appended.
    #[serde(default)]
    pub context_terms: Vec<String>,
    pub generic_term: String,
    /// An item is kept only if its title or description mentions one of these.
    #[serde(default)]
    pub vocabulary: Vec<String>,
}

impl Default for NewsFilterConfig {
    fn default() -> Self {
        let expansions = [
            ("윤석열", "윤석열 대통령"),
            ("이재명", "이재명 민주당"),
            ("탄핵", "탄핵 정치"),
            ("국정감사", "국정감사 정치"),
            ("선거", "선거 정치"),
            ("여당", "여당 국민의힘"),
            ("야당", "야당 민주당"),
        ]
        .into_iter()
        .map(|(k, e)| QueryExpansion {
            keyword: k.to_string(),
            expanded: e.to_string(),
        })
        .collect();

        let context_terms = [
            "정치", "대통령", "국회", "의원", "당", "politic", "president", "parliament",
            "congress", "policy", "party", "election",
        ];

        let vocabulary = [
            // government
            "대통령", "정부", "청와대", "국무총리", "장관", "행정부",
            // legislature
            "국회", "의원", "국정감사", "국정조사", "법안", "입법", "의정",
            // parties
            "민주당", "국민의힘", "정의당", "여당", "야당", "정치인", "정당",
            // issues
            "선거", "투표", "공약", "정책", "개헌", "탄핵", "사퇴", "임명",
            // general
            "정치", "외교", "국정", "정무", "내각", "권력", "정치권",
            // english equivalents
            "president", "government", "minister", "cabinet", "parliament", "congress",
            "senate", "lawmaker", "legislation", "bill", "party", "election", "vote",
            "policy", "impeachment", "diplomacy", "politics", "political", "politician",
        ];

        Self {
            expansions,
            context_terms: context_terms.iter().map(|s| s.to_string()).collect(),
            generic_term: "정치".to_string(),
            vocabulary: vocabulary.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl NewsFilterConfig {
    /// Load from an explicit path. Supports TOML or JSON, picked by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading news filter from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: Self = if ext == "json" {
            serde_json::from_str(&content).context("parsing news filter json")?
        } else {
            toml::from_str(&content).context("parsing news filter toml")?
        };
        Ok(cfg.cleaned())
    }

    /// Load using an explicit override path, then the default file, then
    /// built-in defaults. An override pointing nowhere is an error.
    pub fn load_default(override_path: Option<&str>) -> Result<Self> {
        if let Some(p) = override_path {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_NEWS_FILTER_PATH} points to non-existent path {p}"));
        }
        let default_p = PathBuf::from(DEFAULT_NEWS_FILTER_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        Ok(Self::default())
    }

    /// Trim entries, drop empties, lowercase the matching lists.
    fn cleaned(mut self) -> Self {
        fn clean(items: Vec<String>) -> Vec<String> {
            let mut out: Vec<String> = Vec::with_capacity(items.len());
            for it in items {
                let t = it.trim().to_lowercase();
                if !t.is_empty() && !out.contains(&t) {
                    out.push(t);
                }
            }
            out
        }
        self.context_terms = clean(self.context_terms);
        self.vocabulary = clean(self.vocabulary);
        self.expansions
            .retain(|e| !e.keyword.trim().is_empty() && !e.expanded.trim().is_empty());
        self.generic_term = self.generic_term.trim().to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_and_json_formats_work() {
        let dir = tempfile::tempdir().unwrap();

        let toml_p = dir.path().join("filter.toml");
        fs::write(
            &toml_p,
            r#"
generic_term = "politics"
context_terms = [" Policy ", "", "policy"]
vocabulary = ["Senate", "vote"]

[[expansions]]
keyword = "SCOTUS"
expanded = "Supreme Court"
"#,
        )
        .unwrap();
        let cfg = NewsFilterConfig::load_from(&toml_p).unwrap();
        assert_eq!(cfg.context_terms, vec!["policy".to_string()]);
        assert_eq!(cfg.vocabulary, vec!["senate".to_string(), "vote".to_string()]);
        assert_eq!(cfg.expansions[0].expanded, "Supreme Court");

        let json_p = dir.path().join("filter.json");
        fs::write(
            &json_p,
            r#"{"generic_term":"politics","vocabulary":["Election"]}"#,
        )
        .unwrap();
        let cfg = NewsFilterConfig::load_from(&json_p).unwrap();
        assert!(cfg.expansions.is_empty());
        assert_eq!(cfg.vocabulary, vec!["election".to_string()]);
    }

    #[test]
    fn missing_override_is_an_error() {
        let err = NewsFilterConfig::load_default(Some("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("non-existent"));
    }

    #[test]
    fn defaults_cover_both_languages() {
        let cfg = NewsFilterConfig::default();
        assert!(cfg.vocabulary.iter().any(|v| v == "정책"));
        assert!(cfg.vocabulary.iter().any(|v| v == "policy"));
        assert_eq!(cfg.generic_term, "정치");
    }
}

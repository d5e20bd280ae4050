// src/text.rs
//! Pure text helpers shared by the news filter and the extractor.
//! No I/O here, so everything is unit-testable without a provider.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Strip markup from a provider snippet and decode HTML entities.
///
/// Tags are removed *before* entities are decoded, so escaped brackets
/// (`&lt;b&gt;`) survive as literal text instead of being eaten as tags.
/// Whitespace runs (including NBSP) collapse to a single space.
pub fn sanitize_text(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?s)<[^>]+>").unwrap());
    let stripped = re_tags.replace_all(s, "");

    let decoded = html_escape::decode_html_entities(&stripped);

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

/// Truncate to at most `max` characters. When truncation happens the result
/// is `max - 3` characters (trailing whitespace trimmed) followed by `...`.
pub fn truncate_with_ellipsis(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let head: String = s.chars().take(keep).collect();
    format!("{}...", head.trim_end())
}

/// Cut for log previews; no ellipsis bookkeeping.
pub fn preview(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}...")
    }
}

/// Short, stable identifier for a topic so logs never carry raw user text.
pub fn topic_id(topic: &str) -> String {
    use sha2::{Digest, Sha256};
    Sha256::digest(topic.as_bytes())
        .iter()
        .take(6)
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_then_unescapes() {
        let s = "<b>Budget</b> vote &quot;delayed&quot; &amp; &lt;b&gt;";
        assert_eq!(sanitize_text(s), r#"Budget vote "delayed" & <b>"#);
    }

    #[test]
    fn collapses_whitespace_and_nbsp() {
        assert_eq!(sanitize_text("  a&nbsp;\n\t b  "), "a b");
        assert_eq!(sanitize_text(""), "");
    }

    #[test]
    fn truncation_is_char_based() {
        let s = "가".repeat(400);
        let out = truncate_with_ellipsis(&s, 300);
        assert_eq!(out.chars().count(), 300);
        assert!(out.ends_with("..."));

        let short = "short enough";
        assert_eq!(truncate_with_ellipsis(short, 300), short);
    }

    #[test]
    fn truncation_trims_before_ellipsis() {
        let s = format!("{} tail", "x".repeat(296));
        let out = truncate_with_ellipsis(&s, 300);
        assert_eq!(out, format!("{}...", "x".repeat(296)));
    }

    #[test]
    fn topic_id_is_short_hex() {
        let id = topic_id("economic policy debate");
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, topic_id("economic policy debate"));
    }
}

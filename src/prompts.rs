// src/prompts.rs
//! Prompt assembly. Pure string building, no I/O.

use serde_json::{json, Value};

use crate::models::{NewsItem, Source, SUMMARY_MAX_CHARS};

/// News entries and source links embedded in a draft prompt.
pub const MAX_PROMPT_NEWS: usize = 10;

pub const DRAFT_SYSTEM_PROMPT: &str = "You are a professional political journalist. \
Write a balanced political column grounded in the news data provided.";

pub const EVALUATION_SYSTEM_PROMPT: &str = "You are a content quality-control expert. \
Evaluate the column against the rubric and answer with a single JSON object.";

const WRITING_RULES: &str = "\
- Use plain terms and explanations that a newcomer to politics can follow.
- Write in a neutral news-report register with declarative sentences.
- Put important keywords in **bold** to aid reading.
- Use markdown: ## for major headings, ### for sub-headings, **bold** for emphasis.
- Use 💬 for the stance section, 🔵 for the progressive camp, 🔴 for the conservative camp, 🧨 for the body section and 📌 for the conclusion.
- The progressive and conservative positions must each have exactly 3 bullet points. Every bullet starts with '- ' on its own line.
- Keep the logical flow natural and give enough information to understand the topic.
- Stay unbiased and grounded in the news reports provided.
- Always end the column with links to the news articles you used.
- Camp classification hints:
  * Progressive: 더불어민주당, 조국혁신당, 정의당, Democratic Party
  * Conservative: 국민의힘, 개혁신당, People Power Party
- The summary (the first paragraph) must not exceed 300 characters.";

const TEMPLATE: &str = "\
## A neutral headline that captures the topic and invites reading

A concise summary of the key points in at most 300 characters

## 💬 Where each camp stands on ((core issue))

### 🔵 Progressive position
- (first key position)
- (second key position)
- (third key position)

### 🔴 Conservative position
- (first key position)
- (second key position)
- (third key position)

## 🧨 A neutral, engaging major heading
### A sub-heading on the central point of contention

Lay out the core of the issue. Number each key point and break it into sub-bullets so it is easy to follow.

## 📌 Conclusion: the core of ((core issue)) and what comes next

About 300 to 400 characters

---

## References

### 📰 General references
- [News title](News URL)
- [News title](News URL)

### 🎯 Stance references
- [News title](News URL)
- [News title](News URL)";

const EVALUATION_CRITERIA: &str = "\
1. Format compliance (format):
    - Does it contain every template section (title, summary, stances, body, conclusion)?
    - Do the progressive and conservative positions have exactly 3 bullet points each?
    - Are the technical rules (length limits, paragraph layout) respected?
2. Content quality:
    - Balance (balance): are both camps presented fairly and without bias?
    - Readability (readability): can a newcomer to politics follow the terms and explanations?
    - Completeness (completeness): is the flow logical and the information sufficient?
    - Objectivity (objectivity): does it stay factual and unbiased?";

/// One numbered block per news item, at most [`MAX_PROMPT_NEWS`].
pub fn format_news_for_prompt(news: &[NewsItem]) -> String {
    if news.is_empty() {
        return "No related news was found.".to_string();
    }
    news.iter()
        .take(MAX_PROMPT_NEWS)
        .enumerate()
        .map(|(i, item)| {
            format!(
                "[News {}] {}\n- Content: {}\n- Published: {}\n- Source: {}",
                i + 1,
                item.title,
                item.description,
                item.published_at,
                item.link()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_source_links(sources: &[Source]) -> String {
    if sources.is_empty() {
        return String::new();
    }
    let mut out = String::from("\n\n[Reference sources]\n");
    for (i, s) in sources.iter().take(MAX_PROMPT_NEWS).enumerate() {
        out.push_str(&format!("{}. [{}]({})\n", i + 1, s.title, s.uri));
    }
    out
}

/// Draft prompt: topic, news context, writing rules and the template.
pub fn build_draft_prompt(topic: &str, news: &[NewsItem], sources: &[Source]) -> String {
    format!(
        "Write a column about '{topic}' based on the latest news below.\n\
         Topic: {topic}\n\n\
         [Latest news]\n{news}{links}\n\n\
         [Writing rules]\n{WRITING_RULES}\n\n\
         [Template]\n{TEMPLATE}\n\n\
         **Important**: use the news above to reflect current developments and concrete facts. \
         Base both camps' positions on what the news actually reports.\n\n\
         **Reference requirements**:\n\
         - Always end the column with a \"## References\" section.\n\
         - Split links into \"### 📰 General references\" and \"### 🎯 Stance references\".\n\
         - Write every link as [News title](News URL).\n\
         - Keep the summary within {SUMMARY_MAX_CHARS} characters.",
        news = format_news_for_prompt(news),
        links = format_source_links(sources),
    )
}

/// Evaluation prompt: rubric, scoring process and the draft under review.
pub fn build_evaluation_prompt(content: &str) -> String {
    format!(
        "Review the column below against the [Rubric] and answer in the JSON format described.\n\n\
         [Rubric]\n{EVALUATION_CRITERIA}\n\n\
         [Process]\n\
         1. Score every dimension from 0 to 100.\n\
         2. Set \"pass\" to true only if every score is 85 or higher.\n\
         3. If \"pass\" is false, write concrete improvements for the weakest dimension in \"feedback\"; otherwise praise the column there.\n\
         4. Put a revision based on the feedback in \"revisedContent\". If \"pass\" is true, put the original column there unchanged.\n\n\
         [Response format]\n{schema}\n\n\
         [Column]\n{content}",
        schema = evaluation_schema(),
    )
}

/// JSON schema of the evaluation response.
pub fn evaluation_schema() -> Value {
    let score = |what: &str| json!({ "type": "number", "description": format!("{what} score (0-100)") });
    json!({
        "type": "object",
        "properties": {
            "scores": {
                "type": "object",
                "properties": {
                    "format": score("Format compliance"),
                    "balance": score("Balance"),
                    "readability": score("Readability"),
                    "completeness": score("Completeness"),
                    "objectivity": score("Objectivity"),
                },
                "required": ["format", "balance", "readability", "completeness", "objectivity"]
            },
            "pass": { "type": "boolean", "description": "true when every score is 85 or higher" },
            "feedback": { "type": "string", "description": "Concrete improvements, or praise when passing" },
            "revisedContent": { "type": "string", "description": "The revised column" }
        },
        "required": ["scores", "pass", "feedback", "revisedContent"]
    })
}

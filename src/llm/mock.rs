// src/llm/mock.rs
use async_trait::async_trait;

use super::{CompletionRequest, LlmClient};

/// Deterministic offline model for local runs and tests.
///
/// Draft requests get a template-shaped column built from the `Topic:` line
/// of the prompt; JSON requests get a uniform evaluation with an empty
/// `revisedContent`, which callers read as "keep the draft".
#[derive(Debug, Clone)]
pub struct MockLlm {
    pub score: f64,
}

impl Default for MockLlm {
    fn default() -> Self {
        Self { score: 90.0 }
    }
}

impl MockLlm {
    fn topic_of(prompt: &str) -> &str {
        prompt
            .lines()
            .find_map(|l| l.trim().strip_prefix("Topic:"))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("the issue")
    }

    fn column(topic: &str) -> String {
        format!(
            "## What is at stake in {topic}\n\n\
             The debate over {topic} has moved to the centre of national politics this week.\n\n\
             ## 💬 Where each camp stands on {topic}\n\n\
             ### 🔵 Progressive position\n\
             - Calls for broader public consultation.\n\
             - Stresses the impact on households.\n\
             - Wants stronger oversight.\n\n\
             ### 🔴 Conservative position\n\
             - Warns about fiscal cost.\n\
             - Prefers market-led measures.\n\
             - Questions the timetable.\n\n\
             ## 🧨 The key questions\n\
             ### Three points to watch\n\n\
             1. **Cost**: who pays and when.\n\
             2. **Timing**: how fast changes take effect.\n\
             3. **Oversight**: who checks the outcome.\n\n\
             ## 📌 Conclusion: the core of {topic} and what comes next\n\n\
             Both camps agree the issue matters and disagree on the remedy.\n\n\
             ---\n\n\
             ## References\n\n\
             ### 📰 General references\n\
             - [Mock briefing](https://news.example/mock)\n"
        )
    }

    fn evaluation(&self) -> String {
        serde_json::json!({
            "scores": {
                "format": self.score,
                "balance": self.score,
                "readability": self.score,
                "completeness": self.score,
                "objectivity": self.score,
            },
            "pass": self.score >= crate::models::PASS_THRESHOLD,
            "feedback": "Mock evaluation.",
            "revisedContent": "",
        })
        .to_string()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(&self, req: &CompletionRequest) -> anyhow::Result<String> {
        if req.json_mode {
            return Ok(self.evaluation());
        }
        Ok(Self::column(Self::topic_of(req.user_prompt())))
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

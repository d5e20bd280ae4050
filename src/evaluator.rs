// src/evaluator.rs
//! Rubric scoring and revision via the model, plus the quality report
//! built from a score set.

use metrics::counter;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ColumnError, Result};
use crate::llm::{CompletionRequest, DynLlm};
use crate::models::{Dimension, EvaluationResult, Scores, PASS_THRESHOLD};
use crate::prompts::{build_evaluation_prompt, EVALUATION_SYSTEM_PROMPT};
use crate::text::preview;

const EVAL_TEMPERATURE: f32 = 0.3;
const EVAL_MAX_TOKENS: u32 = 4000;

#[derive(Clone)]
pub struct ContentEvaluator {
    llm: DynLlm,
}

impl ContentEvaluator {
    pub fn new(llm: DynLlm) -> Self {
        Self { llm }
    }

    /// One structured-output model call. Model errors and unparseable
    /// answers are generation failures; a missing single score is 0.
    pub async fn evaluate_and_revise(&self, content: &str) -> Result<EvaluationResult> {
        let req = CompletionRequest::new(EVALUATION_SYSTEM_PROMPT, build_evaluation_prompt(content))
            .temperature(EVAL_TEMPERATURE)
            .max_tokens(EVAL_MAX_TOKENS)
            .json();

        counter!("column_evaluations_total").increment(1);
        let raw = self.llm.complete(&req).await.map_err(|e| {
            tracing::error!(error = %e, provider = self.llm.provider_name(), "evaluation call failed");
            ColumnError::generation(format!("column evaluation failed: {e}"))
        })?;

        let result = parse_evaluation(&raw, content)?;
        if result.passed {
            counter!("column_evaluations_passed_total").increment(1);
        }
        log_evaluation(&result);
        Ok(result)
    }
}

/// Parse the model's JSON answer. `content` is what was evaluated; it stands
/// in for an empty `revisedContent`.
pub fn parse_evaluation(raw: &str, content: &str) -> Result<EvaluationResult> {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return Err(ColumnError::generation("the model returned an empty evaluation"));
    }

    let v: Value = serde_json::from_str(body).map_err(|e| {
        tracing::warn!(error = %e, raw = %preview(body, 200), "unparseable evaluation");
        ColumnError::generation(format!("evaluation response is not valid JSON: {e}"))
    })?;

    let scores_obj = v
        .get("scores")
        .and_then(Value::as_object)
        .ok_or_else(|| ColumnError::generation("evaluation response has no scores object"))?;

    let mut scores = Scores::default();
    for d in Dimension::ALL {
        let s = scores_obj.get(d.key()).and_then(score_value);
        if s.is_none() {
            tracing::warn!(dimension = d.key(), "missing evaluation score, using 0");
        }
        scores.set(d, s.unwrap_or(0.0).clamp(0.0, 100.0));
    }

    let reported_pass = v.get("pass").and_then(Value::as_bool).unwrap_or(false);
    let mut feedback = v
        .get("feedback")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let revised = v
        .get("revisedContent")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(content)
        .to_string();

    let derived = scores.all_passing();
    if derived != reported_pass {
        tracing::warn!(reported_pass, derived, "model pass flag disagrees with its scores");
        if !feedback.is_empty() {
            feedback.push_str("\n\n");
        }
        feedback.push_str(&format!(
            "(The model reported pass={reported_pass}; scores give pass={derived}.)"
        ));
    }

    Ok(EvaluationResult::new(scores, reported_pass, feedback, revised))
}

/// Numbers, or numeric strings such as "88". "NaN" and "inf" count as missing.
fn score_value(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|v| v.is_finite())
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn log_evaluation(r: &EvaluationResult) {
    let (weakest, weakest_score) = r.scores.weakest();
    tracing::info!(
        format = r.scores.format,
        balance = r.scores.balance,
        readability = r.scores.readability,
        completeness = r.scores.completeness,
        objectivity = r.scores.objectivity,
        average = r.scores.average(),
        weakest = weakest.key(),
        weakest_score,
        passed = r.passed,
        feedback = %preview(&r.feedback, 150),
        "evaluation finished"
    );
}

/* ----------------------------
Quality report
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    Good,
    Fair,
    NeedsImprovement,
}

impl Grade {
    pub fn from_average(avg: f64) -> Self {
        match avg {
            a if a >= 90.0 => Self::Excellent,
            a if a >= 80.0 => Self::Good,
            a if a >= 70.0 => Self::Fair,
            _ => Self::NeedsImprovement,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::NeedsImprovement => "needs_improvement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub average_score: f64,
    pub grade: Grade,
    pub passing: bool,
    pub pass_threshold: f64,
    pub weakest_dimension: &'static str,
    pub weakest_score: f64,
    pub detailed_scores: Scores,
}

impl QualityReport {
    pub fn from_scores(scores: Scores) -> Self {
        let average = scores.average();
        let (weakest, weakest_score) = scores.weakest();
        Self {
            average_score: (average * 10.0).round() / 10.0,
            grade: Grade::from_average(average),
            passing: scores.all_passing(),
            pass_threshold: PASS_THRESHOLD,
            weakest_dimension: weakest.key(),
            weakest_score,
            detailed_scores: scores,
        }
    }
}

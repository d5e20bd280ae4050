mod common;

use std::sync::Arc;

use column_forge::models::{ColumnParams, QualityTier, SearchMode};
use common::{news, pipeline, FakeLlm, FakeNews};

fn params(topic: &str, attempts: u32) -> ColumnParams {
    ColumnParams::validate(topic, Some(attempts), Some(7), Some("title"), 3).unwrap()
}

#[tokio::test]
async fn zero_news_is_a_generation_error() {
    let news_src = FakeNews::with(vec![]);
    let llm = FakeLlm::arc(vec![90.0]);
    let p = pipeline(news_src.clone(), llm.clone());

    let err = p.generate_column(&params("budget vote", 3)).await.unwrap_err();
    assert_eq!(err.code(), "CONTENT_GENERATION_ERROR");
    assert_eq!(llm.drafts(), 0);
    assert_eq!(llm.evaluations(), 0);
}

#[tokio::test]
async fn search_failure_counts_as_no_news_on_full_path() {
    let llm = FakeLlm::arc(vec![90.0]);
    let p = pipeline(FakeNews::failing(), llm.clone());
    let err = p.generate_column(&params("budget vote", 3)).await.unwrap_err();
    assert_eq!(err.code(), "CONTENT_GENERATION_ERROR");
    assert_eq!(llm.drafts(), 0);
}

#[tokio::test]
async fn passing_first_evaluation_stops_the_loop() {
    let llm = FakeLlm::arc(vec![90.0]);
    let p = pipeline(FakeNews::with(news(3)), llm.clone());

    let a = p.generate_column(&params("economic policy debate", 5)).await.unwrap();
    assert_eq!(llm.drafts(), 1);
    assert_eq!(llm.evaluations(), 1);
    assert_eq!(a.title, "Budget fight heads to the floor");
    assert_eq!(a.sources.len(), 3);
}

#[tokio::test]
async fn failing_evaluator_runs_exactly_max_attempts() {
    let llm = FakeLlm::arc(vec![50.0]);
    let p = pipeline(FakeNews::with(news(4)), llm.clone());

    let a = p.generate_column(&params("economic policy debate", 4)).await.unwrap();
    assert_eq!(llm.evaluations(), 4);
    // the last revision is kept even though it never passed
    assert_eq!(a.title, "Revised column number 4");
    assert_eq!(a.summary, "Revision 4 summary line.");
    // sources come from the search, not from the revisions
    assert_eq!(a.sources.len(), 4);
    assert_eq!(a.sources[0].uri, "https://publisher.example/0");
}

#[tokio::test]
async fn revision_passing_on_second_attempt() {
    let llm = FakeLlm::arc(vec![70.0, 88.0]);
    let p = pipeline(FakeNews::with(news(2)), llm.clone());
    let a = p.generate_column(&params("economic policy debate", 5)).await.unwrap();
    assert_eq!(llm.evaluations(), 2);
    assert_eq!(a.title, "Revised column number 1");
}

#[tokio::test]
async fn scores_decide_pass_not_the_reported_flag() {
    let mut fake = FakeLlm::new(vec![85.0]);
    fake.reported_pass = Some(false);
    let llm = Arc::new(fake);
    let p = pipeline(FakeNews::with(news(2)), llm.clone());
    p.generate_column(&params("economic policy debate", 3)).await.unwrap();
    assert_eq!(llm.evaluations(), 1);
}

#[tokio::test]
async fn evaluation_error_fails_the_whole_generation() {
    let mut fake = FakeLlm::new(vec![90.0]);
    fake.fail_evaluation = true;
    let p = pipeline(FakeNews::with(news(2)), Arc::new(fake));
    let err = p.generate_column(&params("economic policy debate", 3)).await.unwrap_err();
    assert_eq!(err.code(), "CONTENT_GENERATION_ERROR");
}

#[tokio::test]
async fn preview_then_confirm_searches_once() {
    let news_src = FakeNews::with(news(3));
    let llm = FakeLlm::arc(vec![90.0]);
    let p = pipeline(news_src.clone(), llm.clone());

    let prev = p
        .preview("economic policy debate", 7, SearchMode::Title)
        .await
        .unwrap();
    assert_eq!(prev.quality_tier, QualityTier::Fair);
    assert_eq!(prev.total_count, 3);
    assert_eq!(p.store().len(), 1);

    let a = p
        .confirm(&params("economic policy debate", 1), true)
        .await
        .unwrap();
    assert_eq!(news_src.calls(), 1);
    assert_eq!(llm.drafts(), 1);
    assert!(llm.evaluations() <= 1);
    assert!(a.summary.chars().count() <= 300);
    assert!((5..=100).contains(&a.title.chars().count()));
    assert!(p.store().is_empty());
}

#[tokio::test]
async fn confirm_without_preview_searches_again() {
    let news_src = FakeNews::with(news(6));
    let llm = FakeLlm::arc(vec![90.0]);
    let p = pipeline(news_src.clone(), llm.clone());

    p.confirm(&params("economic policy debate", 2), true).await.unwrap();
    assert_eq!(news_src.calls(), 1);

    // a preview under a different key does not serve this confirm
    p.preview("economic policy debate", 7, SearchMode::All).await.unwrap();
    p.confirm(&params("economic policy debate", 2), true).await.unwrap();
    assert_eq!(news_src.calls(), 3);
    assert_eq!(p.store().len(), 1);
}

#[tokio::test]
async fn declined_confirm_is_cancelled_and_keeps_cache() {
    let news_src = FakeNews::with(news(2));
    let llm = FakeLlm::arc(vec![90.0]);
    let p = pipeline(news_src.clone(), llm.clone());
    p.preview("economic policy debate", 7, SearchMode::Title).await.unwrap();

    let err = p
        .confirm(&params("economic policy debate", 2), false)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "USER_CANCELLED");
    assert_eq!(llm.drafts(), 0);
    assert_eq!(p.store().len(), 1);
}

#[tokio::test]
async fn empty_preview_is_not_cached_and_errors_propagate() {
    let p = pipeline(FakeNews::with(vec![]), FakeLlm::arc(vec![90.0]));
    let prev = p.preview("budget vote", 7, SearchMode::Title).await.unwrap();
    assert_eq!(prev.quality_tier, QualityTier::Poor);
    assert!(prev.items.is_empty());
    assert!(p.store().is_empty());

    let p = pipeline(FakeNews::failing(), FakeLlm::arc(vec![90.0]));
    let err = p.preview("budget vote", 7, SearchMode::Title).await.unwrap_err();
    assert_eq!(err.code(), "NEWS_SEARCH_ERROR");
}

#[tokio::test]
async fn preview_returns_at_most_five_items() {
    let p = pipeline(FakeNews::with(news(12)), FakeLlm::arc(vec![90.0]));
    let prev = p.preview("economic policy debate", 7, SearchMode::Title).await.unwrap();
    assert_eq!(prev.items.len(), 5);
    assert_eq!(prev.total_count, 12);
    assert_eq!(prev.quality_tier, QualityTier::Excellent);
}

#[tokio::test]
async fn single_shot_degrades_to_empty_sources() {
    let llm = FakeLlm::arc(vec![10.0]);
    let p = pipeline(FakeNews::failing(), llm.clone());
    let a = p.generate_single_shot("budget vote").await.unwrap();
    assert!(a.sources.is_empty());
    assert_eq!(llm.drafts(), 1);
    assert_eq!(llm.evaluations(), 0);
    assert!(llm
        .last_draft_prompt
        .lock()
        .unwrap()
        .contains("No related news was found."));
}

#[tokio::test]
async fn draft_prompt_carries_at_most_ten_sources() {
    let llm = FakeLlm::arc(vec![90.0]);
    let p = pipeline(FakeNews::with(news(14)), llm.clone());
    let a = p.generate_column(&params("economic policy debate", 1)).await.unwrap();
    assert_eq!(a.sources.len(), 14);
    let prompt = llm.last_draft_prompt.lock().unwrap().clone();
    assert!(prompt.contains("[News 10]"));
    assert!(!prompt.contains("[News 11]"));
}

#[tokio::test]
async fn quality_metrics_reports_grade() {
    let p = pipeline(FakeNews::with(vec![]), FakeLlm::arc(vec![82.0]));
    let r = p.quality_metrics("some column text").await.unwrap();
    assert_eq!(r.grade.as_str(), "good");
    assert!(!r.passing);
}

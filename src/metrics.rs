use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the preview cache TTL.
    /// Call once per process.
    pub fn init(preview_ttl_secs: u64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("news_search_total", "News searches sent to the provider");
        describe_counter!("news_search_errors_total", "News searches that failed");
        describe_counter!("news_items_kept_total", "News items surviving the filters");
        describe_histogram!("news_search_ms", "News search latency in milliseconds");
        describe_counter!("column_drafts_total", "Draft model calls");
        describe_counter!("column_evaluations_total", "Evaluation model calls");
        describe_counter!("column_evaluations_passed_total", "Evaluations whose scores all pass");
        describe_counter!("column_generations_total", "Columns assembled");
        describe_counter!("column_generation_failures_total", "Generations refused or failed");
        describe_histogram!("column_pipeline_ms", "End-to-end generation time in milliseconds");
        describe_counter!("preview_cache_hits_total", "Confirms served from a cached preview");
        describe_counter!("preview_cache_misses_total", "Confirms that had to search again");
        describe_gauge!("preview_cache_ttl_secs", "Absolute TTL of cached previews");
        describe_counter!("rate_limited_requests_total", "Requests rejected by the rate limiter");
        describe_counter!("http_requests_total", "HTTP requests by status");

        // absolute TTL from insertion, no sliding refresh
        gauge!("preview_cache_ttl_secs").set(preview_ttl_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

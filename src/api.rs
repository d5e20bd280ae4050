// src/api.rs
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{DefaultBodyLimit, FromRequest, Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::cache::{InMemoryPreviewStore, PreviewStore};
use crate::config::{NewsFilterConfig, Settings};
use crate::error::{ColumnError, Result};
use crate::evaluator::QualityReport;
use crate::llm::{build_llm_client, DynLlm};
use crate::models::{iso_now, validate_topic, ColumnParams, GeneratedArticle, NewsItem, Source};
use crate::news::{DisabledNewsSearch, NaverNewsClient, NewsSearch};
use crate::pipeline::{ColumnPipeline, ServiceStatus};
use crate::rate_limit::RateLimiter;

/// Longest content accepted by the quality-metrics endpoint.
const MAX_METRICS_CONTENT_CHARS: usize = 20_000;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: ColumnPipeline,
    pub limiter: Arc<RateLimiter>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings, news: Arc<dyn NewsSearch>, llm: DynLlm) -> Self {
        let store: Arc<dyn PreviewStore> =
            Arc::new(InMemoryPreviewStore::new(settings.preview_cache_ttl()));
        Self {
            pipeline: ColumnPipeline::new(news, llm, store),
            limiter: Arc::new(RateLimiter::per_minute(settings.rate_limit_per_minute)),
            settings: Arc::new(settings),
        }
    }

    /// Wire real providers from settings. Missing news credentials disable
    /// search instead of failing boot.
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let news: Arc<dyn NewsSearch> = if settings.news_search_enabled() {
            let filter =
                NewsFilterConfig::load_default(settings.news_filter_config_path.as_deref())?;
            Arc::new(NaverNewsClient::new(&settings, Arc::new(filter))?)
        } else {
            tracing::warn!("NAVER_CLIENT_ID/NAVER_CLIENT_SECRET not set; news search disabled");
            Arc::new(DisabledNewsSearch)
        };
        let llm = build_llm_client(&settings)?;
        Ok(Self::new(settings, news, llm))
    }
}

pub fn router(state: AppState) -> Router {
    let settings = state.settings.clone();

    let api = Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/generate-column", post(generate_column))
        .route("/api/generate-column/quick", post(generate_quick))
        .route("/api/preview-news", post(preview_news))
        .route("/api/confirm-generation", post(confirm_generation))
        .route("/api/quality-metrics", post(quality_metrics))
        .with_state(state)
        .layer(middleware::from_fn(require_json))
        .layer(DefaultBodyLimit::max(settings.max_request_size));

    let mut app = api
        .layer(cors_layer(&settings))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ));

    if settings.is_production() {
        app = app.layer(SetResponseHeaderLayer::overriding(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        ));
    }

    app.layer(middleware::from_fn(log_requests))
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(600));

    // tower-http refuses a wildcard together with credentials
    if settings.allows_any_origin() {
        tracing::warn!("ALLOWED_ORIGINS is \"*\"; CORS credentials disabled");
        return base.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(origins).allow_credentials(true)
}

/* ----------------------------
Middleware
---------------------------- */

async fn require_json(req: Request, next: Next) -> Response {
    if req.method() == Method::POST {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.trim().to_ascii_lowercase().starts_with("application/json"));
        if !is_json {
            return ColumnError::validation("content-type", "Content-Type must be application/json")
                .into_response();
        }
    }
    next.run(req).await
}

async fn log_requests(req: Request, next: Next) -> Response {
    let t0 = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut resp = next.run(req).await;

    let elapsed = t0.elapsed();
    if let Ok(v) = HeaderValue::from_str(&format!("{:.4}", elapsed.as_secs_f64())) {
        resp.headers_mut()
            .insert(HeaderName::from_static("x-process-time"), v);
    }
    counter!("http_requests_total", "status" => resp.status().as_u16().to_string()).increment(1);
    tracing::info!(
        method = %method,
        path = %path,
        status = resp.status().as_u16(),
        ms = elapsed.as_millis() as u64,
        "request"
    );
    resp
}

/// First `X-Forwarded-For` hop, else `X-Real-IP`, else "unknown".
pub fn client_key(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let real = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    forwarded.or(real).unwrap_or("unknown").to_string()
}

fn enforce_rate_limit(state: &AppState, headers: &HeaderMap) -> Result<()> {
    let key = client_key(headers);
    state.limiter.check(&key, Utc::now()).map_err(|retry_after_secs| {
        counter!("rate_limited_requests_total").increment(1);
        tracing::warn!(client = %key, retry_after_secs, "rate limit exceeded");
        ColumnError::RateLimited { retry_after_secs }
    })
}

/* ----------------------------
Wire types
---------------------------- */

/// `Json` whose rejections render through [`ColumnError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ColumnError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRequest {
    pub topic: String,
    pub max_revision_attempts: Option<u32>,
    pub days_back: Option<u32>,
    pub search_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickRequest {
    pub topic: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub topic: String,
    pub days_back: Option<u32>,
    pub search_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub topic: String,
    pub days_back: Option<u32>,
    pub max_revision_attempts: Option<u32>,
    pub search_mode: Option<String>,
    pub proceed: bool,
}

#[derive(Debug, Deserialize)]
pub struct QualityRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub word_count: usize,
    pub category: &'static str,
    pub created_date: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Serialize)]
pub struct ArticleData {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub metadata: Metadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnResponse {
    pub success: bool,
    pub article: ArticleData,
    pub processed_date: String,
}

impl From<GeneratedArticle> for ColumnResponse {
    fn from(a: GeneratedArticle) -> Self {
        let now = iso_now();
        Self {
            success: true,
            article: ArticleData {
                metadata: Metadata {
                    word_count: a.word_count(),
                    category: "politics",
                    created_date: now.clone(),
                    sources: a.sources,
                },
                title: a.title,
                summary: a.summary,
                content: a.content,
            },
            processed_date: now,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsPreviewItem {
    pub title: String,
    pub description: String,
    pub pub_date: String,
    pub original_link: String,
}

impl From<&NewsItem> for NewsPreviewItem {
    fn from(n: &NewsItem) -> Self {
        Self {
            title: n.title.clone(),
            description: n.description.clone(),
            pub_date: n.published_at.to_string(),
            original_link: n.link().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub success: bool,
    pub topic: String,
    pub search_period: u32,
    pub news_count: usize,
    pub news_items: Vec<NewsPreviewItem>,
    pub total_available: usize,
    pub search_quality: &'static str,
    pub recommendation: String,
    pub processed_date: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityResponse {
    pub success: bool,
    pub metrics: QualityReport,
    pub processed_date: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

/* ----------------------------
Handlers
---------------------------- */

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: iso_now(),
    })
}

async fn status(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(state.pipeline.status())
}

async fn generate_column(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<ColumnRequest>,
) -> Result<Json<ColumnResponse>> {
    enforce_rate_limit(&state, &headers)?;
    let params = ColumnParams::validate(
        &req.topic,
        req.max_revision_attempts,
        req.days_back,
        req.search_mode.as_deref(),
        state.settings.default_revision_attempts,
    )?;
    let article = state.pipeline.generate_column(&params).await?;
    Ok(Json(article.into()))
}

async fn generate_quick(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<QuickRequest>,
) -> Result<Json<ColumnResponse>> {
    enforce_rate_limit(&state, &headers)?;
    let topic = validate_topic(&req.topic)?;
    let article = state.pipeline.generate_single_shot(&topic).await?;
    Ok(Json(article.into()))
}

async fn preview_news(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<PreviewRequest>,
) -> Result<Json<PreviewResponse>> {
    enforce_rate_limit(&state, &headers)?;
    let params = ColumnParams::validate(
        &req.topic,
        None,
        req.days_back,
        req.search_mode.as_deref(),
        state.settings.default_revision_attempts,
    )?;
    let p = state
        .pipeline
        .preview(&params.topic, params.days_back, params.search_mode)
        .await?;

    Ok(Json(PreviewResponse {
        success: true,
        news_count: p.total_count,
        news_items: p.items.iter().map(NewsPreviewItem::from).collect(),
        total_available: p.total_count,
        search_quality: p.quality_tier.as_str(),
        recommendation: p.recommendation,
        search_period: p.days_back,
        topic: p.topic,
        processed_date: iso_now(),
    }))
}

async fn confirm_generation(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiJson(req): ApiJson<ConfirmRequest>,
) -> Result<Json<ColumnResponse>> {
    enforce_rate_limit(&state, &headers)?;
    let params = ColumnParams::validate(
        &req.topic,
        req.max_revision_attempts,
        req.days_back,
        req.search_mode.as_deref(),
        state.settings.default_revision_attempts,
    )?;
    let article = state.pipeline.confirm(&params, req.proceed).await?;
    Ok(Json(article.into()))
}

async fn quality_metrics(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<QualityRequest>,
) -> Result<Json<QualityResponse>> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(ColumnError::validation("content", "content must not be blank"));
    }
    if content.chars().count() > MAX_METRICS_CONTENT_CHARS {
        return Err(ColumnError::validation(
            "content",
            format!("content must be at most {MAX_METRICS_CONTENT_CHARS} characters"),
        ));
    }
    let metrics = state.pipeline.quality_metrics(content).await?;
    Ok(Json(QualityResponse {
        success: true,
        metrics,
        processed_date: iso_now(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_key_precedence() {
        let mut h = HeaderMap::new();
        assert_eq!(client_key(&h), "unknown");
        h.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_key(&h), "10.0.0.9");
        h.insert("x-forwarded-for", HeaderValue::from_static(" 1.2.3.4 , 10.0.0.1"));
        assert_eq!(client_key(&h), "1.2.3.4");
    }
}

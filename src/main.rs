//! Column service binary entrypoint.
//! Boots the Axum HTTP server, wiring settings, providers and middleware.

use column_forge::config::Settings;
use column_forge::metrics::Metrics;
use column_forge::{router, AppState};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` wins over `LOG_LEVEL`. Production logs are JSON, everything
/// else gets the compact formatter.
fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("column_forge={},warn", settings.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    let res = if settings.is_production() {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if let Err(e) = res {
        eprintln!("tracing already initialized: {e}");
    }
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    let settings = Settings::load()?;
    init_tracing(&settings);
    settings.validate()?;

    tracing::info!(
        environment = %settings.environment,
        model = %settings.openai_model,
        news_search = settings.news_search_enabled(),
        rate_limit_per_minute = settings.rate_limit_per_minute,
        "starting column service"
    );

    let metrics = Metrics::init(settings.preview_cache_ttl_secs)?;
    let state = AppState::from_settings(settings)?;
    let app = router(state).merge(metrics.router());

    Ok(app.into())
}

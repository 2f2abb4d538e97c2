//! Embrapa Data API — Binary Entrypoint
//! Boots the Axum HTTP server: config from env/.env, token issuer, dataset
//! routes and the Prometheus `/metrics` endpoint.

use embrapa_data_api::config::ApiConfig;
use embrapa_data_api::metrics::Metrics;
use embrapa_data_api::{api, AppState};
use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - API_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("API_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("embrapa_data_api=debug,info"));

    // Shuttle may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = ApiConfig::from_env()?;
    if cfg.users.is_empty() {
        warn!("API_USERS not set: /token will issue tokens for any username");
    }
    info!(
        base_url = %cfg.base_url,
        token_ttl_mins = cfg.token_ttl.num_minutes(),
        fetch_timeout_secs = cfg.fetch_timeout.as_secs(),
        users = cfg.users.len(),
        "api config loaded"
    );

    let state = AppState::from_config(&cfg)?;
    let mut router = api::create_router(state);

    match Metrics::init() {
        Ok(metrics) => router = router.merge(metrics.router()),
        Err(e) => warn!(error = %e, "prometheus recorder not installed; /metrics disabled"),
    }

    Ok(router.into())
}

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder and describe the API's series.
    /// Fails if a recorder is already installed in this process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;

        describe_counter!("scrape_requests_total", "Dataset fetches attempted, by dataset.");
        describe_counter!(
            "scrape_errors_total",
            "Dataset fetches that failed, by dataset and error kind."
        );
        describe_histogram!("scrape_fetch_ms", "Upstream fetch + text extraction time in ms.");
        describe_counter!("tokens_issued_total", "Access tokens minted by /token.");
        describe_counter!(
            "auth_rejections_total",
            "Requests rejected for missing/invalid tokens or bad credentials."
        );

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

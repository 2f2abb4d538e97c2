// src/report/mod.rs
//! Offline dashboard build: price history + model metrics → one static HTML page.

pub mod html;
pub mod model_metrics;
pub mod prices;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::config::ReportConfig;

pub use html::render_dashboard;
pub use model_metrics::MetricTable;
pub use prices::{load_price_history, PriceRecord};

/// Build the dashboard for `date` and write it to `cfg.output_path`,
/// replacing any previous file. Returns the written path.
pub fn build(cfg: &ReportConfig, date: NaiveDate) -> Result<PathBuf> {
    let price_path = cfg.price_file_for(date);
    let prices = load_price_history(&price_path)
        .with_context(|| format!("loading price history {}", price_path.display()))?;
    let metrics = MetricTable::load(&cfg.metrics_path)?;

    let page = render_dashboard(&prices, &metrics, &cfg.bounded_metrics)?;

    if let Some(parent) = cfg.output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(&cfg.output_path, page)
        .with_context(|| format!("writing {}", cfg.output_path.display()))?;

    info!(
        prices = prices.len(),
        models = metrics.models.len(),
        metrics = metrics.metric_names.len(),
        source = %price_path.display(),
        output = %cfg.output_path.display(),
        "dashboard written"
    );
    Ok(cfg.output_path.clone())
}

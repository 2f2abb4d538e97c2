// src/config/report.rs
use chrono::NaiveDate;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_HISTORY_DIR: &str = "historico_bitcoin";
pub const DEFAULT_METRICS_PATH: &str = "model_metrics.json";
pub const DEFAULT_OUTPUT_PATH: &str = "index.html";

pub const ENV_HISTORY_DIR: &str = "REPORT_HISTORY_DIR";
pub const ENV_PRICE_FILE: &str = "REPORT_PRICE_FILE";
pub const ENV_METRICS_PATH: &str = "REPORT_METRICS_PATH";
pub const ENV_OUTPUT_PATH: &str = "REPORT_OUTPUT_PATH";
pub const ENV_BOUNDED_METRICS: &str = "REPORT_BOUNDED_METRICS";

/// File locations for the dashboard build.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub history_dir: PathBuf,
    /// Explicit price file; when `None` the dated file in `history_dir` is used.
    pub price_file: Option<PathBuf>,
    pub metrics_path: PathBuf,
    pub output_path: PathBuf,
    /// Metrics living in [0, 1] where higher is better (colored red→green).
    pub bounded_metrics: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            history_dir: PathBuf::from(DEFAULT_HISTORY_DIR),
            price_file: None,
            metrics_path: PathBuf::from(DEFAULT_METRICS_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            bounded_metrics: vec!["R2".to_string()],
        }
    }
}

impl ReportConfig {
    /// Defaults, overridden by `REPORT_*` env vars when set and non-empty.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = non_empty_env(ENV_HISTORY_DIR) {
            cfg.history_dir = PathBuf::from(v);
        }
        if let Some(v) = non_empty_env(ENV_PRICE_FILE) {
            cfg.price_file = Some(PathBuf::from(v));
        }
        if let Some(v) = non_empty_env(ENV_METRICS_PATH) {
            cfg.metrics_path = PathBuf::from(v);
        }
        if let Some(v) = non_empty_env(ENV_OUTPUT_PATH) {
            cfg.output_path = PathBuf::from(v);
        }
        if let Some(v) = non_empty_env(ENV_BOUNDED_METRICS) {
            cfg.bounded_metrics = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        cfg
    }

    /// Price file for `date`: `<history_dir>/bitcoin_data<YYYYMMDD>.parquet`,
    /// unless an explicit file was configured.
    pub fn price_file_for(&self, date: NaiveDate) -> PathBuf {
        match &self.price_file {
            Some(p) => p.clone(),
            None => self
                .history_dir
                .join(format!("bitcoin_data{}.parquet", date.format("%Y%m%d"))),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

//! Builds the static Bitcoin dashboard (`index.html` by default) from today's
//! price history parquet and `model_metrics.json`.

use embrapa_data_api::config::ReportConfig;
use embrapa_data_api::report;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let cfg = ReportConfig::from_env();
    let today = chrono::Local::now().date_naive();
    let out = report::build(&cfg, today)?;

    println!("dashboard written to {}", out.display());
    Ok(())
}

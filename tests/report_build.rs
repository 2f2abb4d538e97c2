// tests/report_build.rs
//
// Full dashboard builds from parquet files written by DuckDB into a temp dir.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use duckdb::Connection;
use serde_json::{json, Value};

use embrapa_data_api::config::ReportConfig;
use embrapa_data_api::report::{self, load_price_history};

/// Write `n` daily rows (newest first, to exercise ordering) using `select`,
/// an expression list over `i` (0-based day) and `ts` (timestamp).
fn write_parquet(path: &Path, n: u32, select: &str) {
    let conn = Connection::open_in_memory().unwrap();
    let sql = format!(
        "COPY (SELECT {select} FROM (SELECT i, TIMESTAMP '2024-01-01 00:00:00' + to_days(CAST(i AS INTEGER)) AS ts \
         FROM range({n}) t(i)) ORDER BY i DESC) TO '{}' (FORMAT PARQUET)",
        path.display()
    );
    conn.execute_batch(&sql).unwrap();
}

/// Pull the JSON literal assigned to `var <name> = ...;`.
fn embedded(page: &str, name: &str) -> Value {
    let marker = format!("var {name} = ");
    let start = page.find(&marker).unwrap() + marker.len();
    let end = start + page[start..].find(";\n").unwrap();
    serde_json::from_str(&page[start..end]).unwrap()
}

const METRICS: &str = r#"{"model_x": {"R2": 0.8, "MAE": 5}, "model_y": {"R2": 0.6, "MAE": 10}}"#;

#[test]
fn builds_dashboard_from_dated_files() {
    let dir = tempfile::tempdir().unwrap();
    let history = dir.path().join("historico_bitcoin");
    fs::create_dir_all(&history).unwrap();

    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    write_parquet(
        &history.join("bitcoin_data20240601.parquet"),
        10,
        "ts AS \"timestamp\", CAST(100 + i AS DOUBLE) AS price, \
         CAST(99 + i AS DOUBLE) AS lag_1, CAST(93 + i AS DOUBLE) AS lag_7, \
         CAST(97 + i AS DOUBLE) AS ma_7",
    );
    fs::write(dir.path().join("model_metrics.json"), METRICS).unwrap();

    let cfg = ReportConfig {
        history_dir: history,
        metrics_path: dir.path().join("model_metrics.json"),
        output_path: dir.path().join("out").join("index.html"),
        ..ReportConfig::default()
    };
    let out = report::build(&cfg, date).expect("build dashboard");
    assert_eq!(out, cfg.output_path);

    let page = fs::read_to_string(&out).unwrap();
    let data = embedded(&page, "data");
    let rows = data.as_array().unwrap();
    assert_eq!(rows.len(), 10);
    assert_eq!(rows[0]["timestamp"], "2024-01-01 00:00:00");
    assert_eq!(rows[9]["timestamp"], "2024-01-10 00:00:00");
    assert_eq!(rows[0]["price"], json!(100.0));
    assert_eq!(rows[3]["ma_7"], json!(100.0));
    for row in rows {
        let mut keys: Vec<&str> = row.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["lag_1", "lag_7", "ma_7", "price", "timestamp"]);
    }

    assert_eq!(embedded(&page, "models"), json!(["model_x", "model_y"]));
    assert_eq!(embedded(&page, "metricsData")["MAE"], json!([5, 10]));
    assert_eq!(embedded(&page, "metricsData")["R2"], json!([0.8, 0.6]));

    // Rebuilding overwrites the previous page.
    fs::write(&cfg.output_path, "stale").unwrap();
    report::build(&cfg, date).unwrap();
    assert_ne!(fs::read_to_string(&cfg.output_path).unwrap(), "stale");
}

#[test]
fn pandas_index_and_missing_features_are_handled() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("prices.parquet");
    write_parquet(
        &file,
        9,
        "ts AS \"__index_level_0__\", CAST(i + 1 AS DOUBLE) AS price",
    );

    let recs = load_price_history(&file).unwrap();
    assert_eq!(recs.len(), 9);
    assert_eq!(recs[0].timestamp, "2024-01-01 00:00:00");
    assert_eq!(recs[0].lag_1, None);
    assert_eq!(recs[1].lag_1, Some(1.0));
    assert_eq!(recs[6].lag_7, None);
    assert_eq!(recs[7].lag_7, Some(1.0));
    assert_eq!(recs[5].ma_7, None);
    assert_eq!(recs[6].ma_7, Some(4.0));
    assert_eq!(recs[8].ma_7, Some(6.0));
}

#[test]
fn missing_inputs_abort_the_build() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ReportConfig {
        history_dir: dir.path().to_path_buf(),
        metrics_path: dir.path().join("model_metrics.json"),
        output_path: dir.path().join("index.html"),
        ..ReportConfig::default()
    };
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

    let err = report::build(&cfg, date).unwrap_err();
    assert!(format!("{err:#}").contains("bitcoin_data20240601.parquet"), "{err:#}");
    assert!(!cfg.output_path.exists());

    write_parquet(
        &dir.path().join("bitcoin_data20240601.parquet"),
        3,
        "ts AS \"timestamp\", CAST(i AS DOUBLE) AS price",
    );
    let err = report::build(&cfg, date).unwrap_err();
    assert!(format!("{err:#}").contains("model_metrics.json"), "{err:#}");

    fs::write(&cfg.metrics_path, "{not json").unwrap();
    assert!(report::build(&cfg, date).is_err());
    assert!(!cfg.output_path.exists());
}

#[test]
fn table_without_price_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("bad.parquet");
    write_parquet(&file, 2, "ts AS \"timestamp\", CAST(i AS DOUBLE) AS close");
    let err = load_price_history(&file).unwrap_err();
    assert!(err.to_string().contains("price"), "{err}");
}

#[test]
fn rows_without_timestamp_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("gaps.parquet");
    write_parquet(
        &file,
        4,
        "CASE WHEN i = 1 THEN NULL ELSE ts END AS \"timestamp\", CAST(i AS DOUBLE) AS price",
    );

    let recs = load_price_history(&file).unwrap();
    let stamps: Vec<&str> = recs.iter().map(|r| r.timestamp.as_str()).collect();
    assert_eq!(
        stamps,
        vec!["2024-01-01 00:00:00", "2024-01-03 00:00:00", "2024-01-04 00:00:00"]
    );
    let prices: Vec<f64> = recs.iter().map(|r| r.price).collect();
    assert_eq!(prices, vec![0.0, 2.0, 3.0]);
}

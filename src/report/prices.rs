// src/report/prices.rs
//! Price history loading (parquet via DuckDB) and lag / moving-average features.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use duckdb::Connection;
use serde::{Deserialize, Serialize};

/// Column pandas writes for an unnamed index when saving to parquet.
const PANDAS_INDEX_COLUMN: &str = "__index_level_0__";

/// Window of the trailing moving average (`ma_7`).
pub const MA_WINDOW: usize = 7;

/// One time bucket of the embedded price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub timestamp: String,
    pub price: f64,
    pub lag_1: Option<f64>,
    pub lag_7: Option<f64>,
    pub ma_7: Option<f64>,
}

/// Price `n` rows earlier, `None` for the first `n` rows.
pub fn lag(prices: &[f64], n: usize) -> Vec<Option<f64>> {
    (0..prices.len())
        .map(|i| i.checked_sub(n).map(|j| prices[j]))
        .collect()
}

/// Mean of the trailing `window` prices inclusive of the current one;
/// `None` until `window` observations exist.
pub fn moving_average(prices: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; prices.len()];
    }
    (0..prices.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &prices[i + 1 - window..=i];
            Some(slice.iter().sum::<f64>() / window as f64)
        })
        .collect()
}

/// Load the price table from a parquet file, ordered by timestamp.
///
/// The timestamp comes from a `timestamp` column or from the pandas index
/// column; it is stringified by DuckDB. Feature columns missing from the file
/// are derived from `price`.
pub fn load_price_history(path: &Path) -> Result<Vec<PriceRecord>> {
    if !path.is_file() {
        bail!("price history file not found: {}", path.display());
    }

    let conn = Connection::open_in_memory().context("opening duckdb")?;
    let source = format!("read_parquet('{}')", path.display().to_string().replace('\'', "''"));
    let columns = describe_columns(&conn, &source)
        .with_context(|| format!("reading schema of {}", path.display()))?;

    let ts_col = if columns.contains("timestamp") {
        "timestamp"
    } else if columns.contains(PANDAS_INDEX_COLUMN) {
        PANDAS_INDEX_COLUMN
    } else {
        bail!("{} has no timestamp column or index", path.display());
    };
    if !columns.contains("price") {
        bail!("{} has no price column", path.display());
    }

    let feature = |name: &str| {
        if columns.contains(name) {
            format!("CAST(\"{name}\" AS DOUBLE)")
        } else {
            "CAST(NULL AS DOUBLE)".to_string()
        }
    };
    let sql = format!(
        "SELECT CAST(\"{ts}\" AS VARCHAR), CAST(price AS DOUBLE), {l1}, {l7}, {ma} \
         FROM {source} ORDER BY \"{ts}\"",
        ts = ts_col,
        l1 = feature("lag_1"),
        l7 = feature("lag_7"),
        ma = feature("ma_7"),
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut records = Vec::new();
    let (mut no_price, mut no_timestamp) = (0usize, 0usize);
    while let Some(row) = rows.next()? {
        let Some(timestamp) = row.get::<_, Option<String>>(0)? else {
            no_timestamp += 1;
            continue;
        };
        let Some(price) = row.get::<_, Option<f64>>(1)? else {
            no_price += 1;
            continue;
        };
        records.push(PriceRecord {
            timestamp,
            price,
            lag_1: row.get(2)?,
            lag_7: row.get(3)?,
            ma_7: row.get(4)?,
        });
    }
    if no_price > 0 {
        tracing::warn!(skipped = no_price, path = %path.display(), "rows without price dropped");
    }
    if no_timestamp > 0 {
        tracing::warn!(skipped = no_timestamp, path = %path.display(), "rows without timestamp dropped");
    }

    let missing: Vec<&str> = ["lag_1", "lag_7", "ma_7"]
        .into_iter()
        .filter(|c| !columns.contains(*c))
        .collect();
    if !missing.is_empty() {
        tracing::info!(?missing, "deriving feature columns from price");
        fill_missing_features(&mut records, &missing);
    }

    Ok(records)
}

fn describe_columns(conn: &Connection, source: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT column_name FROM (DESCRIBE SELECT * FROM {source})"
    ))?;
    let mut rows = stmt.query([])?;
    let mut out = HashSet::new();
    while let Some(row) = rows.next()? {
        out.insert(row.get::<_, String>(0)?);
    }
    Ok(out)
}

fn fill_missing_features(records: &mut [PriceRecord], missing: &[&str]) {
    let prices: Vec<f64> = records.iter().map(|r| r.price).collect();
    for &col in missing {
        let derived = match col {
            "lag_1" => lag(&prices, 1),
            "lag_7" => lag(&prices, 7),
            "ma_7" => moving_average(&prices, MA_WINDOW),
            _ => continue,
        };
        for (rec, v) in records.iter_mut().zip(derived) {
            match col {
                "lag_1" => rec.lag_1 = v,
                "lag_7" => rec.lag_7 = v,
                _ => rec.ma_7 = v,
            }
        }
    }
}

// src/report/html.rs
use std::collections::HashMap;

use anyhow::Result;
use once_cell::sync::OnceCell;
use regex::{Captures, Regex};
use serde::Serialize;

use super::model_metrics::MetricTable;
use super::prices::PriceRecord;

const TEMPLATE: &str = include_str!("dashboard.html");

/// Render the self-contained dashboard page.
///
/// Placeholders are filled in a single pass over the template, so inserted
/// names are never scanned for further placeholders.
pub fn render_dashboard(
    prices: &[PriceRecord],
    metrics: &MetricTable,
    bounded_metrics: &[String],
) -> Result<String> {
    let values: HashMap<&str, String> = HashMap::from([
        ("METRIC_OPTIONS", options(&metrics.metric_names)),
        ("MODEL_OPTIONS", options(&metrics.models)),
        ("PRICE_DATA", script_json(prices)?),
        ("METRICS_DATA", script_json(&metrics.metrics_data())?),
        ("MODELS", script_json(&metrics.models)?),
        ("METRIC_NAMES", script_json(&metrics.metric_names)?),
        ("BOUNDED_METRICS", script_json(bounded_metrics)?),
    ]);

    static RE_PLACEHOLDER: OnceCell<Regex> = OnceCell::new();
    let re = RE_PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{\{([A-Z_]+)\}\}").expect("placeholder regex"));
    let page = re.replace_all(TEMPLATE, |caps: &Captures| match values.get(&caps[1]) {
        Some(v) => v.clone(),
        None => caps[0].to_string(),
    });
    Ok(page.into_owned())
}

/// `<option>` list; the first entry is preselected.
fn options(values: &[String]) -> String {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let attr = html_escape::encode_double_quoted_attribute(v);
            let text = html_escape::encode_text(v);
            let selected = if i == 0 { " selected" } else { "" };
            format!("    <option value=\"{attr}\"{selected}>{text}</option>")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pretty JSON safe to inline in a `<script>` element.
fn script_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_string_pretty(value)?;
    Ok(json.replace("</", "<\\/"))
}

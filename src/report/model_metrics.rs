// src/report/model_metrics.rs
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{Map, Number, Value};

/// Model metrics inverted to metric → values ordered by model.
///
/// Model order and metric order follow the source file; metric names are
/// taken from the first model.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    pub models: Vec<String>,
    pub metric_names: Vec<String>,
    /// `values[m][k]` is metric `metric_names[m]` for model `models[k]`.
    values: Vec<Vec<Number>>,
}

impl MetricTable {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading model metrics from {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(s)?;
        let by_model = root
            .as_object()
            .ok_or_else(|| anyhow!("model metrics must be a JSON object"))?;

        let mut models = Vec::with_capacity(by_model.len());
        let mut per_model = Vec::with_capacity(by_model.len());
        for (model, metrics) in by_model {
            let metrics = metrics
                .as_object()
                .ok_or_else(|| anyhow!("metrics for model '{model}' must be an object"))?;
            models.push(model.clone());
            per_model.push(metrics);
        }

        let Some(first) = per_model.first() else {
            bail!("model metrics file lists no models");
        };
        let metric_names: Vec<String> = first.keys().cloned().collect();

        let mut values = Vec::with_capacity(metric_names.len());
        for metric in &metric_names {
            let mut row = Vec::with_capacity(models.len());
            for (model, metrics) in models.iter().zip(&per_model) {
                let v = metrics
                    .get(metric)
                    .ok_or_else(|| anyhow!("model '{model}' has no metric '{metric}'"))?;
                let Value::Number(n) = v else {
                    bail!("metric '{metric}' of model '{model}' is not a number");
                };
                row.push(n.clone());
            }
            values.push(row);
        }

        Ok(Self {
            models,
            metric_names,
            values,
        })
    }

    /// Values of `metric`, one per model in model order.
    pub fn metric(&self, metric: &str) -> Option<&[Number]> {
        let idx = self.metric_names.iter().position(|m| m == metric)?;
        Some(&self.values[idx])
    }

    pub fn metric_f64(&self, metric: &str) -> Option<Vec<f64>> {
        self.metric(metric)
            .map(|row| row.iter().filter_map(Number::as_f64).collect())
    }

    /// JSON object `{metric: [value per model]}` in metric order.
    pub fn metrics_data(&self) -> Map<String, Value> {
        self.metric_names
            .iter()
            .zip(&self.values)
            .map(|(name, row)| {
                let arr = row.iter().cloned().map(Value::Number).collect();
                (name.clone(), Value::Array(arr))
            })
            .collect()
    }
}

use serde::Serialize;

use crate::{metrics::Metric, schema::NormalizedDataset};

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub missing: usize,
    pub min: Metric,
    pub max: Metric,
    pub mean: Metric,
    pub q1: Metric,
    pub median: Metric,
    pub q3: Metric,
    pub std_dev: Metric,
}

/// Summarizes a numeric column, or `None` when it is absent.
pub fn summarize_numeric(dataset: &NormalizedDataset, column: &str) -> Option<ColumnSummary> {
    let values = dataset.numeric(column)?;
    let mut stats = ColumnStats::default();
    for value in values {
        match value {
            Some(v) => stats.add_value(*v),
            None => stats.missing += 1,
        }
    }
    Some(stats.into_summary(column))
}

/// Summaries for every listed column present in the dataset, in list order.
pub fn summarize_columns(dataset: &NormalizedDataset, columns: &[&str]) -> Vec<ColumnSummary> {
    columns
        .iter()
        .filter_map(|column| summarize_numeric(dataset, column))
        .collect()
}

#[derive(Default)]
struct ColumnStats {
    values: Vec<f64>,
    sum: f64,
    sum_squares: f64,
    missing: usize,
    min: Option<f64>,
    max: Option<f64>,
}

impl ColumnStats {
    fn add_value(&mut self, value: f64) {
        self.sum += value;
        self.sum_squares += value * value;
        self.min = Some(match self.min {
            Some(current) => current.min(value),
            None => value,
        });
        self.max = Some(match self.max {
            Some(current) => current.max(value),
            None => value,
        });
        self.values.push(value);
    }

    fn count(&self) -> usize {
        self.values.len()
    }

    fn mean(&self) -> Option<f64> {
        if self.count() > 0 {
            Some(self.sum / self.count() as f64)
        } else {
            None
        }
    }

    fn sorted_values(&self) -> Vec<f64> {
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        sorted
    }

    /// Sample standard deviation; needs at least two values.
    fn std_dev(&self) -> Option<f64> {
        if self.count() < 2 {
            return None;
        }
        let mean = self.mean().filter(|m| m.is_finite())?;
        let count = self.count() as f64;
        let variance = (self.sum_squares - count * mean * mean) / (count - 1.0);
        Some(variance.max(0.0).sqrt())
    }

    fn into_summary(self, column: &str) -> ColumnSummary {
        let sorted = self.sorted_values();
        ColumnSummary {
            column: column.to_string(),
            count: self.count(),
            missing: self.missing,
            min: self.min.into(),
            max: self.max.into(),
            mean: finite(self.mean()),
            q1: finite(quantile(&sorted, 0.25)),
            median: finite(quantile(&sorted, 0.5)),
            q3: finite(quantile(&sorted, 0.75)),
            std_dev: finite(self.std_dev()),
        }
    }
}

/// Linear interpolation between the closest ranks of an ascending slice.
fn quantile(sorted: &[f64], fraction: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let position = fraction * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

fn finite(value: Option<f64>) -> Metric {
    value.filter(|v| v.is_finite()).into()
}

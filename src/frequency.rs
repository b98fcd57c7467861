use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    data::format_plain_number,
    metrics::Metric,
    schema::{Column, NormalizedDataset},
};

pub const MISSING_LABEL: &str = "<missing>";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: usize,
    pub percent: f64,
}

/// Counts each distinct value of a column, missing values included.
///
/// Entries are ordered by count, most frequent first, then by value.
pub fn value_counts(dataset: &NormalizedDataset, column: &str) -> Metric<Vec<FrequencyEntry>> {
    let labels: Vec<Option<String>> = match dataset.column(column) {
        Some(Column::Text(values)) => values.clone(),
        Some(Column::Numeric(values)) => values
            .iter()
            .map(|v| v.map(format_plain_number))
            .collect(),
        Some(Column::Date(values)) => values
            .iter()
            .map(|d| d.map(|d| d.format("%Y-%m-%d").to_string()))
            .collect(),
        None => return Metric::Unavailable,
    };

    let total = labels.len();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in labels {
        let label = label.unwrap_or_else(|| MISSING_LABEL.to_string());
        *counts.entry(label).or_insert(0) += 1;
    }
    Metric::Available(
        counts
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
            .map(|(value, count)| FrequencyEntry {
                value,
                count,
                percent: (count as f64 / total as f64) * 100.0,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data::{Dataset, Value},
        schema::normalize_default,
    };

    fn channels(cells: &[&str]) -> NormalizedDataset {
        let dataset = Dataset::new(
            vec!["channel".to_string()],
            cells.iter().map(|c| vec![Value::from(*c)]).collect(),
        )
        .unwrap();
        normalize_default(&dataset)
    }

    #[test]
    fn counts_include_missing_values() {
        let data = channels(&["web", "store", "web", "", "store", "app", "web"]);
        let counts = value_counts(&data, "channel").into_option().unwrap();
        let summary: Vec<(&str, usize)> = counts
            .iter()
            .map(|entry| (entry.value.as_str(), entry.count))
            .collect();
        assert_eq!(
            summary,
            vec![("web", 3), ("store", 2), (MISSING_LABEL, 1), ("app", 1)]
        );
        let percent_total: f64 = counts.iter().map(|entry| entry.percent).sum();
        assert!((percent_total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_dataset_has_no_entries() {
        let data = channels(&[]);
        assert_eq!(value_counts(&data, "channel"), Metric::Available(Vec::new()));
    }

    #[test]
    fn absent_column_is_unavailable() {
        let data = channels(&["web"]);
        assert_eq!(value_counts(&data, "event_type"), Metric::Unavailable);
    }
}

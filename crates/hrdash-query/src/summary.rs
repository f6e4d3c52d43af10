//! Executive summary over a scope

use hrdash_facts::{distinct_sorted, FactRow};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

use crate::error::QueryError;
use crate::table::{round2, Table};

pub const TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub metric_name: String,
    pub period_group: String,
    pub period: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricMean {
    pub metric_name: String,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    /// Highest single observations, descending
    pub peaks: Vec<Peak>,
    /// Metrics with the highest mean, descending
    pub top_metrics: Vec<MetricMean>,
    pub period_groups: Vec<String>,
    pub metric_count: usize,
    pub row_count: usize,
}

impl ExecutiveSummary {
    pub fn peaks_table(&self) -> Table {
        let mut table = Table::new("peaks", &["metric_name", "period_group", "period", "value"]);
        for p in &self.peaks {
            table.push(vec![
                json!(p.metric_name),
                json!(p.period_group),
                json!(p.period),
                json!(p.value),
            ]);
        }
        table
    }

    pub fn top_metrics_table(&self) -> Table {
        let mut table = Table::new("top_metrics", &["metric_name", "mean"]);
        for m in &self.top_metrics {
            table.push(vec![json!(m.metric_name), json!(m.mean)]);
        }
        table
    }
}

/// Summarize `scope`: top observations, top metric means and scope metadata.
///
/// Sorting is stable, so ties keep fact-row order (peaks) and first
/// appearance (metric means). Metadata counts the whole scope, numeric or not.
pub fn summarize(scope: &[FactRow]) -> Result<ExecutiveSummary, QueryError> {
    if scope.is_empty() {
        return Err(QueryError::NoData { metric: None });
    }

    let numeric: Vec<(&FactRow, f64)> = scope
        .iter()
        .filter_map(|r| r.value.as_number().map(|v| (r, v)))
        .collect();

    let mut ranked = numeric.clone();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let peaks = ranked
        .into_iter()
        .take(TOP_N)
        .map(|(r, v)| Peak {
            metric_name: r.metric_name.clone(),
            period_group: r.period_group.clone(),
            period: r.period.clone(),
            value: round2(v),
        })
        .collect();

    let mut order: Vec<&str> = Vec::new();
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for (row, value) in &numeric {
        let entry = sums.entry(row.metric_name.as_str()).or_insert_with(|| {
            order.push(row.metric_name.as_str());
            (0.0, 0)
        });
        entry.0 += value;
        entry.1 += 1;
    }
    let mut means: Vec<(&str, f64)> = order
        .into_iter()
        .map(|name| {
            let (sum, count) = sums[name];
            (name, sum / count as f64)
        })
        .collect();
    means.sort_by(|a, b| b.1.total_cmp(&a.1));
    let top_metrics = means
        .into_iter()
        .take(TOP_N)
        .map(|(name, mean)| MetricMean {
            metric_name: name.to_string(),
            mean: round2(mean),
        })
        .collect();

    let summary = ExecutiveSummary {
        peaks,
        top_metrics,
        period_groups: distinct_sorted(scope.iter().map(|r| r.period_group.as_str())),
        metric_count: distinct_sorted(scope.iter().map(|r| r.metric_name.as_str())).len(),
        row_count: scope.len(),
    };
    tracing::debug!(
        rows = summary.row_count,
        metrics = summary.metric_count,
        numeric = numeric.len(),
        "Built executive summary"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrdash_facts::CellValue;

    fn row(metric: &str, year: &str, month: &str, value: f64) -> FactRow {
        FactRow {
            category: "Recruitment".into(),
            metric_type: "KPI".into(),
            metric_name: metric.into(),
            frequency: "Monthly".into(),
            formula: String::new(),
            period_group: year.into(),
            period: month.into(),
            value: CellValue::Number(value),
        }
    }

    #[test]
    fn test_empty_scope_fails() {
        assert_eq!(summarize(&[]).unwrap_err(), QueryError::NoData { metric: None });
    }

    #[test]
    fn test_caps_and_ordering() {
        let mut scope = Vec::new();
        for (i, metric) in ["a", "b", "c", "d", "e", "f", "g"].iter().enumerate() {
            scope.push(row(metric, "2025", "January", i as f64));
            scope.push(row(metric, "2024", "January", (i * 2) as f64));
        }
        scope.push(row("h", "2024", "February", f64::NAN));

        let summary = summarize(&scope).unwrap();
        assert_eq!(summary.peaks.len(), TOP_N);
        assert_eq!(summary.top_metrics.len(), TOP_N);
        assert!(summary.peaks.windows(2).all(|w| w[0].value >= w[1].value));
        assert!(summary.top_metrics.windows(2).all(|w| w[0].mean >= w[1].mean));

        assert_eq!(summary.peaks[0].metric_name, "g");
        assert_eq!(summary.peaks[0].value, 12.0);
        assert_eq!(summary.top_metrics[0].metric_name, "g");
        assert_eq!(summary.top_metrics[0].mean, 9.0);

        assert_eq!(summary.period_groups, ["2024", "2025"]);
        assert_eq!(summary.metric_count, 8);
        assert_eq!(summary.row_count, 15);
    }

    #[test]
    fn test_ties_keep_row_order() {
        let scope = vec![
            row("x", "2024", "January", 3.0),
            row("y", "2024", "January", 3.0),
            row("z", "2024", "January", 1.0),
        ];
        let summary = summarize(&scope).unwrap();
        let names: Vec<_> = summary.peaks.iter().map(|p| p.metric_name.as_str()).collect();
        assert_eq!(names, ["x", "y", "z"]);
        let names: Vec<_> = summary.top_metrics.iter().map(|m| m.metric_name.as_str()).collect();
        assert_eq!(names, ["x", "y", "z"]);

        let table = summary.peaks_table();
        assert_eq!(table.columns, ["metric_name", "period_group", "period", "value"]);
        assert_eq!(table.row_count, 3);
        assert_eq!(summary.top_metrics_table().row_count, 3);
    }
}

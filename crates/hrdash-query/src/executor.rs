//! Aggregate queries over a scope for a single metric

use hrdash_facts::FactRow;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

use crate::error::QueryError;
use crate::intent::Aggregation;
use crate::table::{round2, Table};

/// Where an extreme value was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extreme {
    pub value: f64,
    pub period: String,
    pub period_group: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Aggregate {
    Maximum(Extreme),
    Minimum(Extreme),
    Average { value: f64, count: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub metric: String,
    pub aggregate: Aggregate,
    /// Mean per period-group, ascending by period-group
    pub breakdown: Table,
}

/// Rows of `metric` with a numeric value, in fact-row order.
fn numeric_rows<'a>(scope: &'a [FactRow], metric: &str) -> Result<Vec<(&'a FactRow, f64)>, QueryError> {
    let rows: Vec<&FactRow> = scope.iter().filter(|r| r.metric_name == metric).collect();
    if rows.is_empty() {
        return Err(QueryError::NoData {
            metric: Some(metric.to_string()),
        });
    }

    let numeric: Vec<(&FactRow, f64)> = rows
        .into_iter()
        .filter_map(|r| r.value.as_number().map(|v| (r, v)))
        .collect();
    if numeric.is_empty() {
        return Err(QueryError::NonNumeric {
            metric: metric.to_string(),
        });
    }
    Ok(numeric)
}

/// Ties keep the earliest row.
fn extreme(rows: &[(&FactRow, f64)], better: impl Fn(f64, f64) -> bool) -> Extreme {
    let (mut best_row, mut best) = rows[0];
    for (row, value) in &rows[1..] {
        if better(*value, best) {
            best_row = *row;
            best = *value;
        }
    }
    Extreme {
        value: round2(best),
        period: best_row.period.clone(),
        period_group: best_row.period_group.clone(),
    }
}

fn breakdown(rows: &[(&FactRow, f64)]) -> Table {
    let mut groups: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for (row, value) in rows {
        let entry = groups.entry(row.period_group.as_str()).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    let mut table = Table::new("breakdown", &["period_group", "mean"]);
    for (group, (sum, count)) in groups {
        table.push(vec![json!(group), json!(round2(sum / count as f64))]);
    }
    table
}

/// Run `aggregation` for `metric` over `scope`.
///
/// Non-numeric and missing values are dropped before aggregating. The average
/// is the plain mean of every remaining value, across periods and
/// period-groups alike.
pub fn execute(aggregation: Aggregation, scope: &[FactRow], metric: &str) -> Result<QueryOutcome, QueryError> {
    let rows = numeric_rows(scope, metric)?;

    let aggregate = match aggregation {
        Aggregation::Maximum => Aggregate::Maximum(extreme(&rows, |v, best| v > best)),
        Aggregation::Minimum => Aggregate::Minimum(extreme(&rows, |v, best| v < best)),
        Aggregation::Average => {
            let sum: f64 = rows.iter().map(|(_, v)| v).sum();
            Aggregate::Average {
                value: round2(sum / rows.len() as f64),
                count: rows.len(),
            }
        }
    };

    tracing::debug!(?aggregation, metric, values = rows.len(), ?aggregate, "Executed query");

    Ok(QueryOutcome {
        metric: metric.to_string(),
        aggregate,
        breakdown: breakdown(&rows),
    })
}

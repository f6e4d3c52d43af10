//! Set-membership filters over fact rows
//!
//! Each dimension filter keeps the rows whose value for that dimension is in
//! the selection. An empty selection is "no restriction" and passes the rows
//! through untouched. Filters on different dimensions commute.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::FactRow;

/// A filterable column of the fact table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    PeriodGroup,
    Period,
    Category,
    Metric,
}

impl Dimension {
    /// Dashboard application order.
    pub const ALL: [Dimension; 4] = [
        Dimension::PeriodGroup,
        Dimension::Period,
        Dimension::Category,
        Dimension::Metric,
    ];

    pub fn value<'a>(&self, row: &'a FactRow) -> &'a str {
        match self {
            Dimension::PeriodGroup => &row.period_group,
            Dimension::Period => &row.period,
            Dimension::Category => &row.category,
            Dimension::Metric => &row.metric_name,
        }
    }
}

/// Keep rows whose `dimension` value is in `selection`; empty selection keeps all.
pub fn filter_by(rows: Vec<FactRow>, dimension: Dimension, selection: &[String]) -> Vec<FactRow> {
    if selection.is_empty() {
        return rows;
    }
    let allowed: HashSet<&str> = selection.iter().map(String::as_str).collect();
    rows.into_iter()
        .filter(|row| allowed.contains(dimension.value(row)))
        .collect()
}

pub fn filter_period_groups(rows: Vec<FactRow>, selection: &[String]) -> Vec<FactRow> {
    filter_by(rows, Dimension::PeriodGroup, selection)
}

pub fn filter_periods(rows: Vec<FactRow>, selection: &[String]) -> Vec<FactRow> {
    filter_by(rows, Dimension::Period, selection)
}

pub fn filter_categories(rows: Vec<FactRow>, selection: &[String]) -> Vec<FactRow> {
    filter_by(rows, Dimension::Category, selection)
}

pub fn filter_metrics(rows: Vec<FactRow>, selection: &[String]) -> Vec<FactRow> {
    filter_by(rows, Dimension::Metric, selection)
}

/// The active selection per dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSelection {
    pub period_groups: Vec<String>,
    pub periods: Vec<String>,
    pub categories: Vec<String>,
    pub metrics: Vec<String>,
}

impl FilterSelection {
    pub fn get(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::PeriodGroup => &self.period_groups,
            Dimension::Period => &self.periods,
            Dimension::Category => &self.categories,
            Dimension::Metric => &self.metrics,
        }
    }

    pub fn set(&mut self, dimension: Dimension, values: Vec<String>) {
        let slot = match dimension {
            Dimension::PeriodGroup => &mut self.period_groups,
            Dimension::Period => &mut self.periods,
            Dimension::Category => &mut self.categories,
            Dimension::Metric => &mut self.metrics,
        };
        *slot = values;
    }

    pub fn is_unrestricted(&self) -> bool {
        Dimension::ALL.iter().all(|d| self.get(*d).is_empty())
    }

    /// The metric the user pinned, when exactly one is selected.
    pub fn explicit_metric(&self) -> Option<&str> {
        match self.metrics.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    /// Apply all four filters in dashboard order.
    pub fn apply(&self, rows: &[FactRow]) -> Vec<FactRow> {
        self.apply_dimensions(rows, &Dimension::ALL)
    }

    /// Apply every filter except period-group, for questions naming a year.
    pub fn apply_except_period_group(&self, rows: &[FactRow]) -> Vec<FactRow> {
        self.apply_dimensions(
            rows,
            &[Dimension::Period, Dimension::Category, Dimension::Metric],
        )
    }

    pub fn apply_dimensions(&self, rows: &[FactRow], dimensions: &[Dimension]) -> Vec<FactRow> {
        let scope = dimensions
            .iter()
            .fold(rows.to_vec(), |scope, d| filter_by(scope, *d, self.get(*d)));
        tracing::debug!(input = rows.len(), output = scope.len(), "Applied filters");
        scope
    }
}

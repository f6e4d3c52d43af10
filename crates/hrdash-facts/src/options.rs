//! Cascading option lists for the filter dimensions
//!
//! Period-groups and periods come from the whole table. Categories are offered
//! from the rows left after the period-group and period filters, metrics from
//! the rows left after the category filter as well.

use serde::{Deserialize, Serialize};

use crate::filter::{filter_by, Dimension, FilterSelection};
use crate::types::{distinct_sorted, FactTable};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub period_groups: Vec<String>,
    pub periods: Vec<String>,
    pub categories: Vec<String>,
    pub metrics: Vec<String>,
}

impl FilterOptions {
    pub fn cascade(table: &FactTable, selection: &FilterSelection) -> Self {
        let period_groups = table.period_groups();
        let periods = table.periods().to_vec();

        let scope = filter_by(
            table.rows().to_vec(),
            Dimension::PeriodGroup,
            &selection.period_groups,
        );
        let scope = filter_by(scope, Dimension::Period, &selection.periods);
        let categories = distinct_sorted(scope.iter().map(|r| r.category.as_str()));

        let scope = filter_by(scope, Dimension::Category, &selection.categories);
        let metrics = distinct_sorted(scope.iter().map(|r| r.metric_name.as_str()));

        Self {
            period_groups,
            periods,
            categories,
            metrics,
        }
    }

    pub fn get(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::PeriodGroup => &self.period_groups,
            Dimension::Period => &self.periods,
            Dimension::Category => &self.categories,
            Dimension::Metric => &self.metrics,
        }
    }
}

impl FilterSelection {
    /// "Select all" toggle: pin `dimension` to every option currently offered.
    ///
    /// Later dimensions cascade from earlier ones, so this recomputes options
    /// from the current selection first.
    pub fn select_all(&mut self, dimension: Dimension, table: &FactTable) {
        let options = FilterOptions::cascade(table, self);
        self.set(dimension, options.get(dimension).to_vec());
    }

    /// Drop selected values that are no longer offered, e.g. after a reload.
    pub fn retain_available(&mut self, table: &FactTable) {
        for dimension in Dimension::ALL {
            let options = FilterOptions::cascade(table, self);
            let kept: Vec<String> = self
                .get(dimension)
                .iter()
                .filter(|v| options.get(dimension).contains(v))
                .cloned()
                .collect();
            self.set(dimension, kept);
        }
    }
}

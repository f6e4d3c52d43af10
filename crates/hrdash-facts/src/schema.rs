//! Schema normalization: required identifying columns and present periods

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CellValue, RawTable};

/// Canonical period columns, in calendar order.
pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("No period columns found (expected any of {})", MONTHS.join(", "))]
    EmptyPeriods,
}

/// Column names the normalizer looks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub category: String,
    pub metric_type: String,
    pub metric_name: String,
    pub frequency: String,
    pub formula: String,
    pub period_group: String,
    /// Recognized period columns in canonical order
    pub periods: Vec<String>,
}

impl Default for SchemaSpec {
    fn default() -> Self {
        Self {
            category: "Subprocess".to_string(),
            metric_type: "Indicator Type".to_string(),
            metric_name: "Indicator Name".to_string(),
            frequency: "Measurement Frequency".to_string(),
            formula: "Formula / How it is calculated".to_string(),
            period_group: "Year".to_string(),
            periods: MONTHS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl SchemaSpec {
    /// Identifying columns, in record field order.
    pub fn required(&self) -> [&str; 6] {
        [
            self.category.as_str(),
            self.metric_type.as_str(),
            self.metric_name.as_str(),
            self.frequency.as_str(),
            self.formula.as_str(),
            self.period_group.as_str(),
        ]
    }
}

/// One wide source row with its identifying fields resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub category: String,
    pub metric_type: String,
    pub metric_name: String,
    pub frequency: String,
    pub formula: String,
    pub period_group: String,
    /// One cell per present period, aligned with [`ValidatedTable::periods`]
    pub values: Vec<CellValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTable {
    pub records: Vec<RawRecord>,
    pub periods: Vec<String>,
}

/// Validate `table` against `spec`.
///
/// Fails with every missing identifying column at once, or when none of the
/// recognized periods are present. Present periods follow the canonical order
/// of `spec.periods`, not the column order of the source.
pub fn normalize(table: &RawTable, spec: &SchemaSpec) -> Result<ValidatedTable, SchemaError> {
    let missing: Vec<String> = spec
        .required()
        .iter()
        .filter(|c| !table.has_column(c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        tracing::warn!(?missing, "Source is missing required columns");
        return Err(SchemaError::MissingColumns(missing));
    }

    let present: Vec<(String, usize)> = spec
        .periods
        .iter()
        .filter_map(|p| table.column_index(p).map(|idx| (p.clone(), idx)))
        .collect();
    if present.is_empty() {
        tracing::warn!("Source has no recognized period columns");
        return Err(SchemaError::EmptyPeriods);
    }

    // Both lookups succeeded above
    let ids: Vec<usize> = spec
        .required()
        .iter()
        .filter_map(|c| table.column_index(c))
        .collect();

    fn text(row: &[CellValue], idx: usize) -> String {
        row.get(idx).map(|c| c.to_string()).unwrap_or_default()
    }

    let records = table
        .rows
        .iter()
        .map(|row| RawRecord {
            category: text(row, ids[0]),
            metric_type: text(row, ids[1]),
            metric_name: text(row, ids[2]),
            frequency: text(row, ids[3]),
            formula: text(row, ids[4]),
            period_group: text(row, ids[5]),
            values: present
                .iter()
                .map(|(_, idx)| row.get(*idx).cloned().unwrap_or(CellValue::Empty))
                .collect(),
        })
        .collect::<Vec<_>>();

    let periods: Vec<String> = present.into_iter().map(|(p, _)| p).collect();
    tracing::debug!(records = records.len(), ?periods, "Normalized source table");

    Ok(ValidatedTable { records, periods })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str]) -> RawTable {
        RawTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: vec![columns.iter().map(|c| CellValue::Text(format!("{c}-v"))).collect()],
        }
    }

    const IDS: [&str; 6] = [
        "Subprocess",
        "Indicator Type",
        "Indicator Name",
        "Measurement Frequency",
        "Formula / How it is calculated",
        "Year",
    ];

    #[test]
    fn test_missing_columns_are_all_reported() {
        let err = normalize(&table(&["Subprocess", "Year", "January"]), &SchemaSpec::default())
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumns(vec![
                "Indicator Type".into(),
                "Indicator Name".into(),
                "Measurement Frequency".into(),
                "Formula / How it is calculated".into(),
            ])
        );
    }

    #[test]
    fn test_no_periods() {
        let err = normalize(&table(&IDS), &SchemaSpec::default()).unwrap_err();
        assert_eq!(err, SchemaError::EmptyPeriods);
    }

    #[test]
    fn test_periods_follow_canonical_order() {
        let mut cols = IDS.to_vec();
        cols.extend(["March", "January", "Notes", "February"]);
        let validated = normalize(&table(&cols), &SchemaSpec::default()).unwrap();

        assert_eq!(validated.periods, ["January", "February", "March"]);
        let record = &validated.records[0];
        assert_eq!(record.metric_name, "Indicator Name-v");
        assert_eq!(record.period_group, "Year-v");
        assert_eq!(
            record.values,
            vec![
                CellValue::Text("January-v".into()),
                CellValue::Text("February-v".into()),
                CellValue::Text("March-v".into()),
            ]
        );
    }
}

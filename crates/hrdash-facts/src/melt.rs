//! Wide-to-long reshaping

use crate::schema::ValidatedTable;
use crate::types::{FactRow, FactTable};

/// Emit one [`FactRow`] per (record, present period).
///
/// Record-major, period-minor. Values are copied untouched: no coercion and
/// no dropping of empty cells.
pub fn melt(validated: &ValidatedTable) -> FactTable {
    let mut rows = Vec::with_capacity(validated.records.len() * validated.periods.len());

    for record in &validated.records {
        for (period, value) in validated.periods.iter().zip(&record.values) {
            rows.push(FactRow {
                category: record.category.clone(),
                metric_type: record.metric_type.clone(),
                metric_name: record.metric_name.clone(),
                frequency: record.frequency.clone(),
                formula: record.formula.clone(),
                period_group: record.period_group.clone(),
                period: period.clone(),
                value: value.clone(),
            });
        }
    }

    tracing::debug!(rows = rows.len(), "Melted records into fact rows");
    FactTable::new(rows, validated.periods.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawRecord;
    use crate::types::CellValue;
    use std::collections::HashSet;

    fn record(category: &str, metric: &str, year: &str, values: Vec<CellValue>) -> RawRecord {
        RawRecord {
            category: category.into(),
            metric_type: "KPI".into(),
            metric_name: metric.into(),
            frequency: "Monthly".into(),
            formula: String::new(),
            period_group: year.into(),
            values,
        }
    }

    #[test]
    fn test_melt_cardinality_and_uniqueness() {
        let validated = ValidatedTable {
            periods: vec!["January".into(), "February".into()],
            records: vec![
                record("Recruitment", "Cost per hire", "2024", vec![1.0.into(), CellValue::Empty]),
                record("Recruitment", "Cost per hire", "2025", vec!["x".into(), 4.0.into()]),
                record("Payroll", "Overtime", "2025", vec![5.0.into(), 6.0.into()]),
            ],
        };

        let facts = melt(&validated);
        assert_eq!(facts.len(), 3 * 2);

        let keys: HashSet<_> = facts
            .rows()
            .iter()
            .map(|r| (&r.category, &r.metric_name, &r.period_group, &r.period))
            .collect();
        assert_eq!(keys.len(), facts.len());
    }

    #[test]
    fn test_melt_order_and_raw_values() {
        let validated = ValidatedTable {
            periods: vec!["January".into(), "February".into()],
            records: vec![
                record("A", "m1", "2024", vec!["n/a".into(), CellValue::Empty]),
                record("B", "m2", "2024", vec![1.0.into(), 2.0.into()]),
            ],
        };

        let facts = melt(&validated);
        let order: Vec<_> = facts
            .rows()
            .iter()
            .map(|r| (r.category.as_str(), r.period.as_str()))
            .collect();
        assert_eq!(
            order,
            [("A", "January"), ("A", "February"), ("B", "January"), ("B", "February")]
        );
        assert_eq!(facts.rows()[0].value, CellValue::Text("n/a".into()));
        assert_eq!(facts.rows()[1].value, CellValue::Empty);
    }
}

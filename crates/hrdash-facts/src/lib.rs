//! HRDash fact model
//!
//! Wide-to-long reshaping of periodic HR indicator sheets. A workbook holds one
//! sheet per period-group (a year); every sheet carries the identifying columns
//! plus one column per period (a month). The pipeline is:
//!
//! 1. [`Workbook::concat`] - stack all sheets, tagging rows with their sheet name
//! 2. [`normalize`] - check the identifying columns and find the present periods
//! 3. [`melt`] - emit one [`FactRow`] per (record, period)
//!
//! Filtering over the resulting [`FactTable`] lives in [`filter`], the
//! cascading option lists for each filter dimension in [`options`].

pub mod filter;
mod melt;
pub mod options;
mod schema;
mod types;

pub use filter::{Dimension, FilterSelection};
pub use melt::melt;
pub use options::FilterOptions;
pub use schema::{normalize, RawRecord, SchemaError, SchemaSpec, ValidatedTable, MONTHS};
pub use types::*;

/// Run the whole reshaping pipeline on a workbook.
pub fn build_fact_table(workbook: &Workbook, spec: &SchemaSpec) -> Result<FactTable, SchemaError> {
    let table = workbook.concat(&spec.period_group);
    let validated = normalize(&table, spec)?;
    Ok(melt(&validated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_fact_table_one_row_per_sheet_and_period() {
        let columns: Vec<String> = [
            "Subprocess",
            "Indicator Type",
            "Indicator Name",
            "Measurement Frequency",
            "Formula / How it is calculated",
            "January",
            "February",
            "March",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();

        let sheet = |name: &str| Sheet {
            name: name.to_string(),
            table: RawTable {
                columns: columns.clone(),
                rows: vec![vec![
                    CellValue::Text("Recruitment".into()),
                    CellValue::Text("KPI".into()),
                    CellValue::Text("Cost per hire".into()),
                    CellValue::Text("Monthly".into()),
                    CellValue::Text("Total cost / hires".into()),
                    CellValue::Number(1.0),
                    CellValue::Number(2.0),
                    CellValue::Number(3.0),
                ]],
            },
        };

        for n in 1..=4 {
            let workbook = Workbook {
                sheets: (0..n).map(|i| sheet(&format!("202{}", i))).collect(),
            };
            let facts = build_fact_table(&workbook, &SchemaSpec::default()).unwrap();
            assert_eq!(facts.len(), 3 * n);
            assert_eq!(facts.periods(), ["January", "February", "March"]);
        }
    }
}

//! Core value and table types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A single spreadsheet cell as delivered by the source loader.
///
/// Values are kept as-is through reshaping; numeric coercion happens in the
/// consumers (see [`CellValue::as_number`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl CellValue {
    /// Parse a raw text cell: blank is `Empty`, anything `f64` accepts is a number.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::Text(raw.to_string()),
        }
    }

    /// Numeric view of the cell. Missing, unparseable and NaN cells yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            CellValue::Number(n) => *n,
            CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
            CellValue::Empty => return None,
        };
        (!n.is_nan()).then_some(n)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Sheet names and years often arrive as whole numbers
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

/// Column-named rows of cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }
}

/// One sheet of the source workbook; its name is the period-group label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    #[serde(flatten)]
    pub table: RawTable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Stack every sheet into one table and tag each row with its sheet name
    /// under `label_column`.
    ///
    /// Columns are the union of all sheet columns in first-seen order. A sheet
    /// lacking a column contributes `Empty` cells for it. An existing
    /// `label_column` is overwritten by the sheet name.
    pub fn concat(&self, label_column: &str) -> RawTable {
        let mut columns: Vec<String> = Vec::new();
        for sheet in &self.sheets {
            for col in &sheet.table.columns {
                if !columns.contains(col) {
                    columns.push(col.clone());
                }
            }
        }
        let label_idx = match columns.iter().position(|c| c == label_column) {
            Some(idx) => idx,
            None => {
                columns.push(label_column.to_string());
                columns.len() - 1
            }
        };

        let mut rows = Vec::new();
        for sheet in &self.sheets {
            let mapping: Vec<Option<usize>> = columns
                .iter()
                .map(|c| sheet.table.column_index(c))
                .collect();

            for source_row in &sheet.table.rows {
                let mut row: Vec<CellValue> = mapping
                    .iter()
                    .map(|idx| {
                        idx.and_then(|i| source_row.get(i).cloned())
                            .unwrap_or(CellValue::Empty)
                    })
                    .collect();
                row[label_idx] = CellValue::Text(sheet.name.clone());
                rows.push(row);
            }
        }

        tracing::debug!(
            sheets = self.sheets.len(),
            rows = rows.len(),
            columns = columns.len(),
            "Concatenated workbook"
        );

        RawTable { columns, rows }
    }
}

/// One observation: a (category, metric, period-group, period) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRow {
    pub category: String,
    pub metric_type: String,
    pub metric_name: String,
    pub frequency: String,
    pub formula: String,
    pub period_group: String,
    pub period: String,
    pub value: CellValue,
}

/// The long-form fact table of one load.
///
/// Never mutated after construction; a reload builds a new table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactTable {
    rows: Vec<FactRow>,
    periods: Vec<String>,
}

impl FactTable {
    pub fn new(rows: Vec<FactRow>, periods: Vec<String>) -> Self {
        Self { rows, periods }
    }

    pub fn rows(&self) -> &[FactRow] {
        &self.rows
    }

    /// Periods present in the source, in canonical order.
    pub fn periods(&self) -> &[String] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted distinct period-group labels.
    pub fn period_groups(&self) -> Vec<String> {
        distinct_sorted(self.rows.iter().map(|r| r.period_group.as_str()))
    }

    /// Sorted distinct non-empty metric names.
    pub fn metric_names(&self) -> Vec<String> {
        distinct_sorted(self.rows.iter().map(|r| r.metric_name.as_str()))
    }
}

/// Sorted distinct values, skipping blanks.
pub fn distinct_sorted<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    values
        .into_iter()
        .filter(|v| !v.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

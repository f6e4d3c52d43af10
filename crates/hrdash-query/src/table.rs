//! Supporting tables handed to the presentation layer

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            row_count: 0,
        }
    }

    pub fn push(&mut self, row: Vec<Value>) {
        self.rows.push(row);
        self.row_count = self.rows.len();
    }

    /// Value of `column` in row `idx`.
    pub fn cell(&self, idx: usize, column: &str) -> Option<&Value> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(idx)?.get(col)
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_records(&self) -> Vec<serde_json::Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str(&format!("| {} |\n", self.columns.join(" | ")));
        md.push_str(&format!(
            "|{}|\n",
            self.columns.iter().map(|_| "---").collect::<Vec<_>>().join("|")
        ));
        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    Value::Null => String::new(),
                    Value::Number(n) => match n.as_f64() {
                        Some(f) if n.is_f64() => format!("{f:.2}"),
                        _ => n.to_string(),
                    },
                    _ => v.to_string(),
                })
                .collect();
            md.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        md
    }
}

/// Round to two decimals, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_and_records() {
        let mut table = Table::new("breakdown", &["period_group", "mean"]);
        table.push(vec![json!("2024"), json!(12.5)]);
        table.push(vec![json!("2025"), json!(7)]);

        assert_eq!(table.row_count, 2);
        assert_eq!(table.cell(1, "mean"), Some(&json!(7)));
        assert_eq!(table.cell(0, "missing"), None);
        assert_eq!(table.to_records()[0]["period_group"], json!("2024"));
    }

    #[test]
    fn test_markdown() {
        let mut table = Table::new("t", &["Year", "Value"]);
        table.push(vec![json!("2024"), json!(1.5)]);
        table.push(vec![json!("2025"), json!(3)]);
        assert_eq!(
            table.to_markdown(),
            "| Year | Value |\n|---|---|\n| 2024 | 1.50 |\n| 2025 | 3 |\n"
        );
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(25.5), 25.5);
        assert_eq!(round2(1.234), 1.23);
        assert_eq!(round2(1.236), 1.24);
        assert_eq!(round2(-2.345_1), -2.35);
    }
}

use hrdash_facts::Workbook;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::{SourceError, SourceLoader};

/// A JSON workbook file.
///
/// ```json
/// { "sheets": [{ "name": "2025", "columns": ["Subprocess", "..."], "rows": [["Recruitment", 12.5, null]] }] }
/// ```
#[derive(Debug, Clone)]
pub struct JsonWorkbookSource {
    path: PathBuf,
}

impl JsonWorkbookSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceLoader for JsonWorkbookSource {
    fn load(&self) -> Result<Workbook, SourceError> {
        if !self.path.is_file() {
            return Err(SourceError::NotFound(self.path.clone()));
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let workbook: Workbook = serde_json::from_reader(reader)?;
        tracing::debug!(sheets = workbook.sheets.len(), "Read JSON workbook");
        Ok(workbook)
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

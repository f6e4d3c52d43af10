use hrdash_facts::{CellValue, RawTable, Sheet, Workbook};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::{SourceError, SourceLoader};

/// A directory of `*.csv` files, one sheet per file.
///
/// Sheets are ordered by file name; the sheet name is the file stem, so
/// `2024.csv` becomes period-group `2024`.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    dir: PathBuf,
}

impl CsvDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn sheet_paths(&self) -> Result<Vec<PathBuf>, SourceError> {
        if !self.dir.is_dir() {
            return Err(SourceError::NotFound(self.dir.clone()));
        }
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let is_csv = path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
            if path.is_file() && is_csv {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

fn read_sheet(path: &Path) -> Result<Sheet, SourceError> {
    let file = File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);

    let columns: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let mut row: Vec<CellValue> = record.iter().map(CellValue::parse).collect();
        row.resize(columns.len(), CellValue::Empty);
        rows.push(row);
    }

    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::debug!(sheet = %name, rows = rows.len(), "Read CSV sheet");

    Ok(Sheet {
        name,
        table: RawTable { columns, rows },
    })
}

impl SourceLoader for CsvDirSource {
    fn load(&self) -> Result<Workbook, SourceError> {
        let sheets = self
            .sheet_paths()?
            .iter()
            .map(|p| read_sheet(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Workbook { sheets })
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.dir.display())
    }
}

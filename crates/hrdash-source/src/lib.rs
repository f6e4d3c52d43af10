//! HRDash workbook sources
//!
//! Loads the per-year indicator sheets from local files and builds the fact
//! table from them. Two layouts are supported:
//!
//! - a directory of CSV files, one sheet per file named by the file stem
//! - a JSON document `{ "sheets": [{ "name", "columns", "rows" }] }`
//!
//! [`CachedSource`] keeps the last built table for a TTL.

mod cache;
mod csv_dir;
mod json;

pub use cache::{CachedSource, DEFAULT_TTL};
pub use csv_dir::CsvDirSource;
pub use json::JsonWorkbookSource;

use hrdash_facts::{build_fact_table, FactTable, SchemaError, SchemaSpec, Workbook};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Workbook has no sheets")]
    EmptyWorkbook,

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Anything that can produce a workbook.
pub trait SourceLoader: Send + Sync {
    fn load(&self) -> Result<Workbook, SourceError>;

    /// Human readable location, for logs.
    fn describe(&self) -> String;
}

/// Pick a loader for `path`: a directory reads CSV sheets, a `.json` file a
/// JSON workbook.
pub fn open(path: impl AsRef<Path>) -> Result<Box<dyn SourceLoader>, SourceError> {
    let path = path.as_ref();
    if path.is_dir() {
        Ok(Box::new(CsvDirSource::new(path)))
    } else if path.is_file() && path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) {
        Ok(Box::new(JsonWorkbookSource::new(path)))
    } else {
        Err(SourceError::NotFound(path.to_path_buf()))
    }
}

/// Load, concatenate, validate and reshape.
pub fn load_fact_table(loader: &dyn SourceLoader, spec: &SchemaSpec) -> Result<FactTable, SourceError> {
    let workbook = loader.load()?;
    if workbook.sheets.is_empty() {
        return Err(SourceError::EmptyWorkbook);
    }
    let facts = build_fact_table(&workbook, spec)?;
    tracing::info!(
        source = %loader.describe(),
        sheets = workbook.sheets.len(),
        rows = facts.len(),
        "Loaded fact table"
    );
    Ok(facts)
}

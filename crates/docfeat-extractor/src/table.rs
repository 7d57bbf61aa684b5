//! Table assembly and CSV output

use crate::error::ExtractorError;
use docfeat_domain::{is_missing, ExtractedRow, ResultTable, MISSING_SENTINEL};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Aligns extracted rows into a single table
///
/// Columns are the union of all row keys in first-seen order, followed by
/// the filename column. Cells a row lacks are filled with "N/A", and any
/// feature column that is missing in every row is dropped.
#[derive(Debug, Clone)]
pub struct TableAssembler {
    filename_column: String,
}

impl TableAssembler {
    /// Create an assembler with the given filename column header
    pub fn new(filename_column: impl Into<String>) -> Self {
        Self {
            filename_column: filename_column.into(),
        }
    }

    /// Header of the filename column
    pub fn filename_column(&self) -> &str {
        &self.filename_column
    }

    /// Build the table; rows keep their input order
    pub fn assemble(&self, rows: &[ExtractedRow]) -> ResultTable {
        let mut seen = HashSet::new();
        let mut candidates: Vec<&str> = Vec::new();
        for row in rows {
            for key in row.values.keys() {
                let key = key.as_str();
                // A feature named like the filename column would shadow it
                if key != self.filename_column && seen.insert(key) {
                    candidates.push(key);
                }
            }
        }

        let (kept, dropped): (Vec<&str>, Vec<&str>) = candidates
            .into_iter()
            .partition(|column| rows.iter().any(|row| has_value(row, column)));
        if !dropped.is_empty() {
            debug!("Dropping all-missing column(s): {}", dropped.join(", "));
        }

        let mut columns: Vec<String> = kept.iter().map(|c| c.to_string()).collect();
        columns.push(self.filename_column.clone());

        let rows = rows
            .iter()
            .map(|row| {
                let mut cells: Vec<String> = kept
                    .iter()
                    .map(|column| match row.values.get(column) {
                        Some(value) if !is_missing(value) => value.to_string(),
                        _ => MISSING_SENTINEL.to_string(),
                    })
                    .collect();
                cells.push(row.source.clone());
                cells
            })
            .collect();

        ResultTable { columns, rows }
    }
}

impl Default for TableAssembler {
    fn default() -> Self {
        Self::new(docfeat_domain::DEFAULT_FILENAME_COLUMN)
    }
}

fn has_value(row: &ExtractedRow, column: &str) -> bool {
    row.values.get(column).is_some_and(|value| !is_missing(value))
}

/// Write the table as CSV: one header row, then one row per document
pub fn write_csv<W: Write>(table: &ResultTable, writer: W) -> Result<(), ExtractorError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(&table.columns)?;
    for row in &table.rows {
        csv.write_record(row)?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the table to a CSV file, creating parent directories as needed
pub fn save_csv(table: &ResultTable, path: impl AsRef<Path>) -> Result<(), ExtractorError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(path)?;
    write_csv(table, file)?;

    info!("Saved {} row(s) to {}", table.len(), path.display());
    Ok(())
}

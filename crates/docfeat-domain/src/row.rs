//! Row module - extracted rows and the assembled result table

use crate::feature::FeatureMap;

/// One document's extracted feature values
///
/// Created once per document and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRow {
    /// Filename of the originating document
    pub source: String,

    /// Feature values; every schema feature is present, possibly as "N/A"
    pub values: FeatureMap,

    /// Size of the global schema this row was extracted against
    pub schema_len: usize,
}

impl ExtractedRow {
    /// Create a new row
    pub fn new(source: impl Into<String>, values: FeatureMap, schema_len: usize) -> Self {
        Self {
            source: source.into(),
            values,
            schema_len,
        }
    }
}

/// Aligned table ready for row-major CSV serialization
///
/// Every row has exactly `columns.len()` cells. Rows follow document
/// processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    /// Header cells
    pub columns: Vec<String>,

    /// Data rows, one per document
    pub rows: Vec<Vec<String>>,
}

impl ResultTable {
    /// Index of a column by exact header
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Cell lookup by row index and header
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

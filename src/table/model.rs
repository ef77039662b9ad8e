//! Table types.

use serde::{Deserialize, Serialize};

use crate::parser::BBox;

/// A table found on a page.
///
/// Rows are ordered top to bottom and cells left to right. A `None` cell
/// marks a grid position covered by a merged cell; an empty cell is
/// `Some("")`. Rows are not guaranteed to have equal lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Bounding box of the table in page space
    pub bbox: BBox,

    /// Cell values, row by row
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Create a table from its bounding box and rows.
    pub fn new(bbox: BBox, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { bbox, rows }
    }

    /// Get the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the number of columns (widest row).
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether every row has the same number of cells.
    pub fn is_rectangular(&self) -> bool {
        let width = self.column_count();
        self.rows.iter().all(|r| r.len() == width)
    }

    /// Text of a cell, if present.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Get plain text representation of the table (tab-separated).
    pub fn plain_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.as_deref().unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

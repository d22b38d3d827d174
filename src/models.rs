//! Data models for the merge pipeline.
//!
//! This module contains the core data structures used throughout
//! the application for representing cells, raw input tables and the
//! aggregated output table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single spreadsheet cell value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Numeric value (integers are widened to f64).
    Number(f64),
    /// Text value, kept exactly as read (no trimming).
    Text(String),
    /// Empty or missing cell.
    #[default]
    Null,
}

impl Cell {
    /// Create a text cell.
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Returns true for `Null` and for a `NaN` number.
    pub fn is_null(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Number(n) => n.is_nan(),
            Cell::Text(_) => false,
        }
    }

    /// Returns the numeric value, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the text value, if this is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Whole numbers print without a trailing ".0" ("42", not "42.0").
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Null => Ok(()),
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(n: Option<f64>) -> Self {
        n.map(Cell::Number).unwrap_or(Cell::Null)
    }
}

/// A named column of a raw input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawColumn {
    /// Header text, matched exactly (case and whitespace sensitive).
    pub header: String,
    /// Cell values, top to bottom.
    pub cells: Vec<Cell>,
}

impl RawColumn {
    pub fn new(header: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            header: header.into(),
            cells,
        }
    }
}

/// The contents of one input workbook's sheet.
///
/// Columns are not guaranteed to match across tables; the merger performs
/// an outer union on headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    /// Columns in sheet order.
    pub columns: Vec<RawColumn>,
}

impl RawTable {
    /// Creates a table from a list of columns.
    pub fn new(columns: Vec<RawColumn>) -> Self {
        Self { columns }
    }

    /// Builds a table from a header row and row-major data.
    ///
    /// Rows shorter than the header are padded with `Null`; extra trailing
    /// cells beyond the header are dropped.
    pub fn from_rows<H, S>(headers: H, rows: Vec<Vec<Cell>>) -> Self
    where
        H: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut columns: Vec<RawColumn> = headers
            .into_iter()
            .map(|h| RawColumn::new(h, Vec::with_capacity(rows.len())))
            .collect();

        for row in rows {
            let mut row = row.into_iter();
            for column in columns.iter_mut() {
                column.cells.push(row.next().unwrap_or(Cell::Null));
            }
        }

        Self { columns }
    }

    /// Returns the column with the given header, if present.
    pub fn column(&self, header: &str) -> Option<&RawColumn> {
        self.columns.iter().find(|c| c.header == header)
    }

    /// Number of data rows (length of the first column).
    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.cells.len()).unwrap_or(0)
    }

    /// Column headers in order.
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.header.as_str()).collect()
    }
}

/// Role a column plays in the aggregated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// The agent identity column.
    Identity,
    /// A duration metric, held as seconds.
    Duration,
    /// Any other column (first-wins value).
    Other,
}

/// A column of the aggregated table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// The merged, aggregated table.
///
/// Every row has exactly `columns.len()` cells. Unless the merge was
/// degenerate, the last row is the summary row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Index of the column with the given name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Index of the identity column.
    pub fn identity_index(&self) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.kind == ColumnKind::Identity)
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the cell at (row, column name).
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Finds the first row whose identity cell is the given text.
    pub fn row_for(&self, identity: &str) -> Option<&[Cell]> {
        let idx = self.identity_index()?;
        self.rows
            .iter()
            .find(|r| r.get(idx).and_then(Cell::as_text) == Some(identity))
            .map(Vec::as_slice)
    }

    /// Number of rows, including the summary row.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

//! Export formatting.
//!
//! Projects an aggregated table into what the outside world needs: a
//! display copy with `H:MM:SS` strings, a serialization copy with durations
//! as fractions of a day, and per-column style directives for the
//! spreadsheet writer.

use crate::duration;
use crate::models::{Cell, ColumnKind, Table};
use serde::Serialize;

/// Spreadsheet number format for durations; hours are not capped at 24.
pub const DURATION_FORMAT: &str = "[h]:mm:ss";

/// Default worksheet name.
pub const SHEET_NAME: &str = "Sheet1";

/// Horizontal alignment override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Right,
}

/// Style directives for one column.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ColumnStyle {
    /// Alignment of the header cell.
    pub header_align: Option<Align>,
    /// Alignment of every data cell, summary row included.
    pub data_align: Option<Align>,
    /// Number format of every data cell.
    pub number_format: Option<String>,
}

impl ColumnStyle {
    /// Whether this style changes anything.
    pub fn is_plain(&self) -> bool {
        self.header_align.is_none() && self.data_align.is_none() && self.number_format.is_none()
    }
}

/// Options for building an export.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub sheet_name: String,
    pub duration_format: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            sheet_name: SHEET_NAME.to_string(),
            duration_format: DURATION_FORMAT.to_string(),
        }
    }
}

impl From<&crate::config::OutputConfig> for ExportOptions {
    fn from(config: &crate::config::OutputConfig) -> Self {
        Self {
            sheet_name: config.sheet_name.clone(),
            duration_format: config.duration_format.clone(),
        }
    }
}

/// Everything the display surface and the spreadsheet writer need.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRequest {
    /// Worksheet name.
    pub sheet_name: String,
    /// Durations rendered as `H:MM:SS` text.
    pub display: Table,
    /// Durations as fractions of a day.
    pub values: Table,
    /// One entry per column, in column order.
    pub styles: Vec<ColumnStyle>,
}

/// Build an export request with default options.
pub fn build_export(table: &Table) -> ExportRequest {
    build_export_with(table, &ExportOptions::default())
}

/// Build an export request.
pub fn build_export_with(table: &Table, options: &ExportOptions) -> ExportRequest {
    let display = map_durations(table, |cell| Cell::Text(duration::format_cell(cell)));
    let values = map_durations(table, |cell| match cell.as_number() {
        Some(secs) if !secs.is_nan() => Cell::Number(duration::to_day_fraction(secs)),
        _ => Cell::Null,
    });

    let styles = table
        .columns
        .iter()
        .map(|column| match column.kind {
            ColumnKind::Duration => ColumnStyle {
                header_align: Some(Align::Right),
                data_align: Some(Align::Right),
                number_format: Some(options.duration_format.clone()),
            },
            ColumnKind::Other => ColumnStyle {
                header_align: Some(Align::Right),
                data_align: Some(Align::Right),
                number_format: None,
            },
            ColumnKind::Identity => ColumnStyle::default(),
        })
        .collect();

    ExportRequest {
        sheet_name: options.sheet_name.clone(),
        display,
        values,
        styles,
    }
}

/// Copy `table`, replacing every duration cell with `f(cell)`.
fn map_durations(table: &Table, f: impl Fn(&Cell) -> Cell) -> Table {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&table.columns)
                .map(|(cell, column)| match column.kind {
                    ColumnKind::Duration => f(cell),
                    _ => cell.clone(),
                })
                .collect()
        })
        .collect();

    Table {
        columns: table.columns.clone(),
        rows,
    }
}

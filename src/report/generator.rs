//! Preview generation.
//!
//! Renders the display copy of a merged table for the terminal, either as
//! a Markdown table or as JSON.

use crate::export::{Align, ColumnStyle, ExportRequest};
use crate::models::Cell;
use anyhow::Result;
use chrono::{DateTime, Local};
use serde::Serialize;

/// Facts about one merge run, printed above the preview.
#[derive(Debug, Clone, Serialize)]
pub struct MergeSummary {
    /// Number of workbooks merged.
    pub files_merged: usize,
    /// Distinct agents in the result.
    pub agents: usize,
    /// When the output was generated.
    pub generated_at: DateTime<Local>,
    /// Where the workbook was written.
    pub output: String,
}

/// Generate a Markdown preview of the display table.
pub fn generate_table_preview(summary: &MergeSummary, export: &ExportRequest) -> String {
    let mut output = String::new();

    output.push_str(&generate_summary_section(summary));
    output.push_str(&generate_table_section(export));

    output
}

fn generate_summary_section(summary: &MergeSummary) -> String {
    let mut section = String::new();

    section.push_str("## Preview of Merged Data\n\n");
    section.push_str(&format!("- **Files Merged:** {}\n", summary.files_merged));
    section.push_str(&format!("- **Agents:** {}\n", summary.agents));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        summary.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    section.push_str(&format!("- **Output:** `{}`\n\n", summary.output));

    section
}

/// Render the display table as a padded Markdown table.
fn generate_table_section(export: &ExportRequest) -> String {
    let table = &export.display;
    let headers: Vec<String> = table.columns.iter().map(|c| escape_cell(&c.name)).collect();
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| escape_cell(&cell.to_string())).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, header)| {
            rows.iter()
                .filter_map(|r| r.get(idx))
                .map(|s| s.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect();

    let plain = ColumnStyle::default();
    let right: Vec<bool> = (0..headers.len())
        .map(|idx| export.styles.get(idx).unwrap_or(&plain).data_align == Some(Align::Right))
        .collect();

    let mut section = String::new();
    section.push_str(&render_row(&headers, &widths, &right));

    let rule: Vec<String> = widths
        .iter()
        .zip(&right)
        .map(|(w, r)| {
            if *r {
                format!("{}:", "-".repeat(w - 1))
            } else {
                format!(":{}", "-".repeat(w - 1))
            }
        })
        .collect();
    section.push_str(&format!("| {} |\n", rule.join(" | ")));

    for row in &rows {
        section.push_str(&render_row(row, &widths, &right));
    }
    section.push('\n');

    section
}

/// Make cell text safe inside a single Markdown table row.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}

fn render_row(cells: &[String], widths: &[usize], right: &[bool]) -> String {
    let padded: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(idx, &width)| {
            let cell = cells.get(idx).map(String::as_str).unwrap_or("");
            if right[idx] {
                format!("{:>width$}", cell, width = width)
            } else {
                format!("{:<width$}", cell, width = width)
            }
        })
        .collect();

    format!("| {} |\n", padded.join(" | "))
}

#[derive(Serialize)]
struct JsonPreview<'a> {
    summary: &'a MergeSummary,
    sheet: &'a str,
    columns: Vec<&'a str>,
    rows: &'a [Vec<Cell>],
}

/// Generate a JSON preview of the display table.
pub fn generate_json_preview(summary: &MergeSummary, export: &ExportRequest) -> Result<String> {
    let preview = JsonPreview {
        summary,
        sheet: &export.sheet_name,
        columns: export.display.column_names(),
        rows: &export.display.rows,
    };
    serde_json::to_string_pretty(&preview).map_err(Into::into)
}

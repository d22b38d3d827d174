//! Workbook adapters backed by `calamine` (read) and `rust_xlsxwriter` (write).

use super::{SheetReader, SheetWriter};
use crate::duration;
use crate::error::SheetError;
use crate::export::{Align, ColumnStyle, ExportRequest};
use crate::models::{Cell, RawTable};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Format, FormatAlign, Workbook};
use std::collections::HashSet;
use std::io::Cursor;
use tracing::debug;

/// Excel worksheet limits.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

/// Reads the first worksheet of an xlsx/xlsm/xlsb/xls/ods workbook.
///
/// The first row is the header row. Repeated headers are renamed
/// `Team`, `Team.1`, `Team.2`, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxReader;

impl SheetReader for XlsxReader {
    fn read(&self, bytes: &[u8]) -> Result<RawTable, SheetError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(SheetError::NoWorksheet)??;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(header_row) => header_row
                .iter()
                .enumerate()
                .map(|(idx, data)| header_name(idx, data))
                .collect(),
            None => return Ok(RawTable::default()),
        };

        let headers = dedupe_headers(headers);

        let data: Vec<Vec<Cell>> = rows.map(|row| row.iter().map(to_cell).collect()).collect();
        debug!("Read {} columns, {} rows", headers.len(), data.len());

        Ok(RawTable::from_rows(headers, data))
    }
}

fn header_name(idx: usize, data: &Data) -> String {
    match data {
        Data::String(s) => s.clone(),
        Data::Empty => format!("Unnamed: {}", idx),
        other => to_cell(other).to_string(),
    }
}

/// Suffix later repeats of a header with `.1`, `.2`, ...
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = headers.iter().cloned().collect();
    let mut first = HashSet::new();

    headers
        .into_iter()
        .map(|header| {
            if first.insert(header.clone()) {
                return header;
            }
            let mut n = 1;
            loop {
                let candidate = format!("{}.{}", header, n);
                if seen.insert(candidate.clone()) {
                    debug!("Renamed repeated header {:?} to {:?}", header, candidate);
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}

/// Map a workbook value onto a cell.
///
/// Time-formatted cells become `H:MM:SS` text so duration columns stored
/// as spreadsheet times survive normalization.
fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => {
            let value = dt.as_f64();
            if dt.is_duration() || (0.0..1.0).contains(&value) {
                Cell::Text(duration::format(Some(duration::from_day_fraction(value))))
            } else {
                match dt.as_datetime() {
                    Some(datetime) => Cell::Text(datetime.format("%Y-%m-%d %H:%M:%S").to_string()),
                    None => Cell::Number(value),
                }
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) | Data::Empty => Cell::Null,
    }
}

/// Writes an export request as a single-sheet xlsx workbook.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxWriter;

impl SheetWriter for XlsxWriter {
    fn write(&self, request: &ExportRequest) -> Result<Vec<u8>, SheetError> {
        let table = &request.values;

        if table.rows.len() + 1 > MAX_ROWS {
            return Err(SheetError::TooLarge(format!("{} rows", table.rows.len())));
        }
        if table.columns.len() > MAX_COLUMNS {
            return Err(SheetError::TooLarge(format!("{} columns", table.columns.len())));
        }

        let plain = ColumnStyle::default();
        let formats: Vec<(Option<Format>, Option<Format>)> = (0..table.columns.len())
            .map(|idx| {
                let style = request.styles.get(idx).unwrap_or(&plain);
                if style.is_plain() {
                    (None, None)
                } else {
                    (header_format(style), data_format(style))
                }
            })
            .collect();

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(request.sheet_name.as_str())?;

        for (idx, column) in table.columns.iter().enumerate() {
            let col = idx as u16;
            match &formats[idx].0 {
                Some(format) => {
                    worksheet.write_string_with_format(0, col, column.name.as_str(), format)?
                }
                None => worksheet.write_string(0, col, column.name.as_str())?,
            };
        }

        for (r, row) in table.rows.iter().enumerate() {
            let row_num = (r + 1) as u32;
            for (idx, cell) in row.iter().enumerate() {
                let col = idx as u16;
                let format = formats.get(idx).and_then(|f| f.1.as_ref());
                match (cell, format) {
                    (Cell::Number(n), _) if n.is_nan() => {}
                    (Cell::Number(n), Some(format)) => {
                        worksheet.write_number_with_format(row_num, col, *n, format)?;
                    }
                    (Cell::Number(n), None) => {
                        worksheet.write_number(row_num, col, *n)?;
                    }
                    (Cell::Text(s), Some(format)) => {
                        worksheet.write_string_with_format(row_num, col, s.as_str(), format)?;
                    }
                    (Cell::Text(s), None) => {
                        worksheet.write_string(row_num, col, s.as_str())?;
                    }
                    (Cell::Null, Some(format)) => {
                        worksheet.write_blank(row_num, col, format)?;
                    }
                    (Cell::Null, None) => {}
                }
            }
        }

        let bytes = workbook.save_to_buffer()?;
        debug!(
            "Wrote sheet {:?}: {} rows, {} bytes",
            request.sheet_name,
            table.rows.len(),
            bytes.len()
        );
        Ok(bytes)
    }
}

fn header_format(style: &ColumnStyle) -> Option<Format> {
    style.header_align.map(|align| Format::new().set_align(to_format_align(align)))
}

fn data_format(style: &ColumnStyle) -> Option<Format> {
    if style.data_align.is_none() && style.number_format.is_none() {
        return None;
    }

    let mut format = Format::new();
    if let Some(align) = style.data_align {
        format = format.set_align(to_format_align(align));
    }
    if let Some(ref num_format) = style.number_format {
        format = format.set_num_format(num_format.as_str());
    }
    Some(format)
}

fn to_format_align(align: Align) -> FormatAlign {
    match align {
        Align::Right => FormatAlign::Right,
    }
}

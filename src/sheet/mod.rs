//! Spreadsheet I/O.
//!
//! The merge pipeline never touches files; it talks to workbooks through
//! these two traits.

pub mod xlsx;

use crate::error::SheetError;
use crate::export::ExportRequest;
use crate::models::RawTable;

pub use xlsx::{XlsxReader, XlsxWriter};

/// Decodes workbook bytes into a raw table.
pub trait SheetReader {
    fn read(&self, bytes: &[u8]) -> Result<RawTable, SheetError>;
}

/// Encodes an export request into workbook bytes.
pub trait SheetWriter {
    fn write(&self, request: &ExportRequest) -> Result<Vec<u8>, SheetError>;
}

//! Error types for the merge pipeline and spreadsheet I/O.

use thiserror::Error;

/// Errors reported by the merger. No partial table accompanies any of them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MergeError {
    #[error("No valid Excel files uploaded.")]
    EmptyInput,

    #[error("{0} column not found in the data.")]
    Schema(String),

    #[error("Malformed input table {table}: {reason}")]
    Structure { table: usize, reason: String },

    #[error("Error merging files: {0}")]
    Merge(String),
}

/// Errors from reading or writing workbooks.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Failed to open workbook: {0}")]
    Open(#[from] calamine::Error),

    #[error("Workbook has no worksheet")]
    NoWorksheet,

    #[error("Failed to write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),

    #[error("Table too large for a worksheet: {0}")]
    TooLarge(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display() {
        let err = MergeError::Schema("Collector Name".to_string());
        assert_eq!(err.to_string(), "Collector Name column not found in the data.");
    }

    #[test]
    fn test_empty_input_display() {
        assert_eq!(
            MergeError::EmptyInput.to_string(),
            "No valid Excel files uploaded."
        );
    }

    #[test]
    fn test_structure_error_display() {
        let err = MergeError::Structure {
            table: 2,
            reason: "duplicate column \"Talk Time\"".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed input table 2: duplicate column \"Talk Time\""
        );
    }

    #[test]
    fn test_sheet_error_display() {
        assert_eq!(SheetError::NoWorksheet.to_string(), "Workbook has no worksheet");
        let err = SheetError::TooLarge("70000 columns".to_string());
        assert!(err.to_string().contains("70000 columns"));
    }
}

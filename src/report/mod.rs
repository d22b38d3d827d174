//! Terminal preview of the merged table.

pub mod generator;

pub use generator::{generate_json_preview, generate_table_preview, MergeSummary};

//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.callmerge.toml` files.

use crate::export::{DURATION_FORMAT, SHEET_NAME};
use crate::merge::{DROP_COLUMNS, DURATION_COLUMNS, IDENTITY_COLUMN, SUMMARY_LABEL};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".callmerge.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Column roles.
    #[serde(default)]
    pub columns: ColumnsConfig,

    /// Output workbook settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Input discovery settings.
    #[serde(default)]
    pub scanner: ScannerConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory the merged workbook is written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Column names the merger works with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsConfig {
    /// Agent identity column.
    #[serde(default = "default_identity")]
    pub identity: String,

    /// Identity value of the summary row.
    #[serde(default = "default_summary_label")]
    pub summary_label: String,

    /// Administrative columns removed before aggregation.
    #[serde(default = "default_drop")]
    pub drop: Vec<String>,

    /// Columns holding durations.
    #[serde(default = "default_durations")]
    pub durations: Vec<String>,

    /// Group agents on the trimmed identity value.
    #[serde(default)]
    pub trim_identity: bool,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            identity: default_identity(),
            summary_label: default_summary_label(),
            drop: default_drop(),
            durations: default_durations(),
            trim_identity: false,
        }
    }
}

fn default_identity() -> String {
    IDENTITY_COLUMN.to_string()
}

fn default_summary_label() -> String {
    SUMMARY_LABEL.to_string()
}

fn default_drop() -> Vec<String> {
    DROP_COLUMNS.iter().map(|s| s.to_string()).collect()
}

fn default_durations() -> Vec<String> {
    DURATION_COLUMNS.iter().map(|s| s.to_string()).collect()
}

/// Output workbook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File name prefix; a `_YYYYmmdd_HHMMSS.xlsx` suffix is appended.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Worksheet name.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Number format applied to duration cells.
    #[serde(default = "default_duration_format")]
    pub duration_format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file_prefix: default_file_prefix(),
            sheet_name: default_sheet_name(),
            duration_format: default_duration_format(),
        }
    }
}

fn default_file_prefix() -> String {
    "Merged_Excel".to_string()
}

fn default_sheet_name() -> String {
    SHEET_NAME.to_string()
}

fn default_duration_format() -> String {
    DURATION_FORMAT.to_string()
}

/// Input discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Workbook extensions accepted as input.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Descend into subdirectories of input directories.
    #[serde(default)]
    pub recursive: bool,

    /// Maximum workbook size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            recursive: false,
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["xlsx", "xls", "xlsm", "ods"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only explicitly provided values override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref dir) = args.output_dir {
            self.general.output_dir = dir.clone();
        }

        if let Some(ref identity) = args.identity {
            self.columns.identity = identity.clone();
        }

        if args.trim_identity {
            self.columns.trim_identity = true;
        }

        if let Some(ref sheet) = args.sheet_name {
            self.output.sheet_name = sheet.clone();
        }

        if args.recursive {
            self.scanner.recursive = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

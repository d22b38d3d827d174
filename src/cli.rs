//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Callmerge - merge call-center agent exports into one summary workbook
///
/// Reads every input workbook, sums each agent's duration columns across
/// all files, appends an "Average" row and writes a formatted xlsx file.
///
/// Examples:
///   callmerge week1.xlsx week2.xlsx
///   callmerge ./exports --recursive -o ./reports
///   callmerge ./exports --output merged.xlsx --format json
///   callmerge ./exports --dry-run
///   callmerge --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Input workbooks or directories containing them
    #[arg(value_name = "PATH", required_unless_present = "init_config")]
    pub inputs: Vec<PathBuf>,

    /// Directory for the timestamped output workbook
    ///
    /// Defaults to the current directory or the config file setting.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Exact output file path (overrides --output-dir and the timestamped name)
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .callmerge.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Preview format printed after merging (table, json, none)
    #[arg(long, default_value = "table", value_name = "FORMAT")]
    pub format: PreviewFormat,

    /// Identity column header
    #[arg(long, value_name = "NAME", env = "CALLMERGE_IDENTITY")]
    pub identity: Option<String>,

    /// Group agents on the trimmed identity value
    #[arg(long)]
    pub trim_identity: bool,

    /// Worksheet name of the output workbook
    #[arg(long, value_name = "NAME")]
    pub sheet_name: Option<String>,

    /// Descend into subdirectories of input directories
    #[arg(short, long)]
    pub recursive: bool,

    /// List the workbooks that would be merged and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .callmerge.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Preview format for the merged table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PreviewFormat {
    /// Aligned text table (default)
    #[default]
    Table,
    /// JSON array of row objects
    Json,
    /// No preview
    None,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.inputs.is_empty() {
            return Err("At least one input workbook or directory is required".to_string());
        }

        for input in &self.inputs {
            if !input.exists() {
                return Err(format!("Input path does not exist: {}", input.display()));
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref dir) = self.output_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(format!(
                    "Output path is not a directory: {}",
                    dir.display()
                ));
            }
        }

        if let Some(ref identity) = self.identity {
            if identity.is_empty() {
                return Err("Identity column name cannot be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

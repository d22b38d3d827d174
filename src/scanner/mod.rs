//! Input scanner for discovering workbooks.
//!
//! Expands the paths given on the command line into a list of workbook
//! files, respecting the configured extensions and size limit.

use anyhow::{bail, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Configuration for input discovery.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Workbook extensions to include (e.g., ["xlsx", "xls"])
    pub extensions: Vec<String>,
    /// Descend into subdirectories
    pub recursive: bool,
    /// Maximum file size in bytes
    pub max_file_size: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from(&crate::config::ScannerConfig::default())
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            recursive: config.recursive,
            max_file_size: config.max_file_size,
        }
    }
}

/// A discovered input workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Path as discovered
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

impl InputFile {
    /// File name for display.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Expands input paths into workbook files.
pub struct InputScanner {
    config: ScanConfig,
}

impl InputScanner {
    /// Create a new input scanner.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// Resolve every input path, in the order given.
    ///
    /// Explicit files must carry an accepted extension. Directories are
    /// listed in name order. Duplicates are dropped.
    pub fn scan(&self, inputs: &[PathBuf]) -> Result<Vec<InputFile>> {
        let mut files = Vec::new();
        let mut seen = HashSet::new();

        for input in inputs {
            if input.is_dir() {
                for file in self.walk_dir(input) {
                    if seen.insert(file.path.clone()) {
                        files.push(file);
                    }
                }
            } else if input.is_file() {
                if !self.has_accepted_extension(input) {
                    bail!(
                        "Unsupported file type: {} (expected one of: {})",
                        input.display(),
                        self.config.extensions.join(", ")
                    );
                }
                if let Some(file) = self.input_file(input) {
                    if seen.insert(file.path.clone()) {
                        files.push(file);
                    }
                }
            } else {
                bail!("Input path not found: {}", input.display());
            }
        }

        debug!("Discovered {} input workbooks", files.len());
        Ok(files)
    }

    /// Check if a file matches scan criteria.
    pub fn matches(&self, path: &Path) -> bool {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if is_hidden(name) {
                return false;
            }
        }

        self.has_accepted_extension(path)
    }

    fn has_accepted_extension(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        self.config.extensions.contains(&ext)
    }

    fn input_file(&self, path: &Path) -> Option<InputFile> {
        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                warn!("Cannot read metadata for {}: {}", path.display(), e);
                return None;
            }
        };

        if metadata.len() > self.config.max_file_size {
            warn!(
                "Skipping {} ({} bytes exceeds limit of {})",
                path.display(),
                metadata.len(),
                self.config.max_file_size
            );
            return None;
        }

        Some(InputFile {
            path: path.to_path_buf(),
            size: metadata.len(),
        })
    }

    fn walk_dir(&self, dir: &Path) -> Vec<InputFile> {
        let max_depth = if self.config.recursive { usize::MAX } else { 1 };

        WalkDir::new(dir)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !is_hidden(&entry.file_name().to_string_lossy())
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Cannot read directory entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.matches(entry.path()))
            .filter_map(|entry| self.input_file(entry.path()))
            .collect()
    }
}

/// Hidden files and editor lock files (`~$report.xlsx`).
fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.starts_with("~$")
}

//! Callmerge - call-center agent report merger
//!
//! Merges per-agent activity exports from several workbooks into one
//! table, sums duration metrics per agent, appends an "Average" row and
//! writes the result as a formatted xlsx workbook.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Error (bad arguments, unreadable input, schema error, write failure)

mod cli;
mod config;
mod duration;
mod error;
mod export;
mod merge;
mod models;
mod report;
mod scanner;
mod sheet;

use anyhow::{Context, Result};
use chrono::Local;
use cli::{Args, PreviewFormat};
use config::Config;
use error::MergeError;
use export::ExportOptions;
use indicatif::{ProgressBar, ProgressStyle};
use merge::{Merger, Schema};
use models::{RawTable, Table};
use report::MergeSummary;
use scanner::{InputFile, InputScanner, ScanConfig};
use sheet::{SheetReader, SheetWriter, XlsxReader, XlsxWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Callmerge v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args) {
        error!("Merge failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .callmerge.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  .callmerge.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .callmerge.toml")?;

    println!("✅ Created .callmerge.toml with default settings.");
    println!("   Edit it to customize column names, output naming, and input discovery.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete merge workflow.
fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Step 1: Discover input workbooks
    let input_scanner = InputScanner::new(ScanConfig::from(&config.scanner));
    let files = input_scanner.scan(&args.inputs)?;

    if args.dry_run {
        handle_dry_run(&files);
        return Ok(());
    }

    if files.is_empty() {
        return Err(MergeError::EmptyInput.into());
    }

    // Step 2: Read every workbook
    if !args.quiet {
        println!("📥 Reading {} workbook(s)...", files.len());
    }
    let tables = read_tables(&XlsxReader, &files, !args.quiet)?;
    if !args.quiet {
        println!("✅ Successfully loaded {} file(s)!", files.len());
    }

    // Step 3: Merge and aggregate
    let merger = Merger::new(Schema::from(&config.columns));
    debug!("Schema: {:?}", merger.schema());
    let table = merger.merge(&tables)?;

    // Step 4: Build and write the export
    let export = export::build_export_with(&table, &ExportOptions::from(&config.output));
    let bytes = XlsxWriter
        .write(&export)
        .context("Failed to build output workbook")?;

    let generated_at = Local::now();
    let output_path = match args.output {
        Some(ref path) => path.clone(),
        None => timestamped_output(
            &config.general.output_dir,
            &config.output.file_prefix,
            &generated_at,
        ),
    };

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }
    std::fs::write(&output_path, &bytes)
        .with_context(|| format!("Failed to write workbook to {}", output_path.display()))?;
    info!("Wrote {} bytes to {}", bytes.len(), output_path.display());

    // Step 5: Preview
    let summary = MergeSummary {
        files_merged: files.len(),
        agents: agent_count(&table, &config.columns.summary_label),
        generated_at,
        output: output_path.display().to_string(),
    };

    match args.format {
        PreviewFormat::Table => println!("\n{}", report::generate_table_preview(&summary, &export)),
        PreviewFormat::Json => println!("{}", report::generate_json_preview(&summary, &export)?),
        PreviewFormat::None => {}
    }

    if !args.quiet {
        println!("✅ Merged workbook saved to: {}", output_path.display());
    }

    Ok(())
}

/// Handle --dry-run: print the discovered workbooks.
fn handle_dry_run(files: &[InputFile]) {
    println!("\n🔍 Dry run: discovered workbooks (nothing is read or written)...\n");

    if files.is_empty() {
        println!("   No matching workbooks found.");
    } else {
        for file in files {
            println!("     📄 {} ({} bytes)", file.path.display(), file.size);
        }
        println!("\n   Total: {} files", files.len());
    }
}

/// Read every input workbook into a raw table.
fn read_tables(
    reader: &impl SheetReader,
    files: &[InputFile],
    show_progress: bool,
) -> Result<Vec<RawTable>> {
    let pb = if show_progress {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut tables = Vec::with_capacity(files.len());
    for file in files {
        if let Some(ref pb) = pb {
            pb.set_message(file.name());
        }

        let bytes = std::fs::read(&file.path)
            .with_context(|| format!("Failed to read {}", file.path.display()))?;
        let table = reader
            .read(&bytes)
            .with_context(|| format!("Failed to parse workbook {}", file.path.display()))?;

        debug!(
            "{}: {} rows, columns {:?}",
            file.name(),
            table.row_count(),
            table.headers()
        );
        if table.columns.is_empty() {
            warn!("{} has an empty first worksheet", file.name());
        }
        tables.push(table);

        if let Some(ref pb) = pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    Ok(tables)
}

/// `{dir}/{prefix}_{YYYYmmdd_HHMMSS}.xlsx`
fn timestamped_output(dir: &Path, prefix: &str, at: &chrono::DateTime<Local>) -> PathBuf {
    dir.join(format!("{}_{}.xlsx", prefix, at.format("%Y%m%d_%H%M%S")))
}

/// Number of agent rows, excluding the trailing summary row when present.
fn agent_count(table: &Table, summary_label: &str) -> usize {
    let has_summary = table
        .identity_index()
        .and_then(|idx| table.rows.last().map(|row| &row[idx]))
        .and_then(|cell| cell.as_text())
        == Some(summary_label);

    if has_summary {
        table.len() - 1
    } else {
        table.len()
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .callmerge.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

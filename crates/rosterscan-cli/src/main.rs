//! rosterscan CLI - Weekly schedule imports from the command line
//!
//! Imports precomputed OCR fragments of a scanned schedule against a JSON
//! employee list and a JSON shift file, previews single cells, and prints the
//! effective configuration.

use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rosterscan::plugins::{InMemoryDirectory, InMemoryShiftStore, Plugin, PrecomputedOcr};
use rosterscan::{ImportConfig, ImportOptions, ImportReport, ImportStatus, ParseOutcome, import_document, parse_time_cell};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rosterscan",
    version,
    about = "Reconstruct weekly staffing schedules from OCR output",
    after_help = "EXAMPLES:\n  \
                  # Preview what a scan would import\n  \
                  rosterscan import fragments.json --employees staff.json --dry-run\n\n  \
                  # Import into a shift file\n  \
                  rosterscan import fragments.json --employees staff.json --store shifts.json\n\n  \
                  # Check how a single cell is read\n  \
                  rosterscan parse-cell \"9:00A-5:00P\""
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a schedule from precomputed OCR fragments
    Import {
        /// JSON file with the OCR fragments of every page
        fragments: PathBuf,

        /// JSON file with the employee list
        #[arg(short, long)]
        employees: PathBuf,

        /// JSON shift file, created if missing
        #[arg(short, long, default_value = "shifts.json")]
        store: PathBuf,

        /// Parse and report without writing any shift
        #[arg(long)]
        dry_run: bool,

        /// Configuration file (TOML, YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Reference date (YYYY-MM-DD) for undated columns and year-less dates
        #[arg(long)]
        reference_date: Option<NaiveDate>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show how a single cell's text is read
    ParseCell {
        /// Raw cell text
        text: String,

        /// Configuration file (TOML, YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Configuration file (TOML, YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "rosterscan=debug" } else { "rosterscan=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Explicit config file, else `rosterscan.toml` discovered upwards, else defaults.
fn load_config(path: Option<&Path>) -> Result<ImportConfig> {
    match path {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            ImportConfig::from_file(path).with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => match ImportConfig::discover().context("Failed to discover rosterscan.toml")? {
            Some(config) => {
                tracing::debug!("Using discovered rosterscan.toml");
                Ok(config)
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(ImportConfig::default())
            }
        },
    }
}

fn print_report(report: &ImportReport) {
    if let Some(shifts) = &report.parsed_shifts {
        println!("Parsed {} shifts (dry run):", shifts.len());
        for shift in shifts {
            let review = if shift.needs_review() { "  [review]" } else { "" };
            println!(
                "  {:<20} {} {}-{}  {}{}",
                shift.employee_name,
                shift.date,
                shift.start_time.format("%H:%M"),
                shift.end_time.format("%H:%M"),
                shift.location.as_deref().unwrap_or("-"),
                review
            );
        }
    } else {
        println!("Imported {} shifts", report.imported_count);
    }

    println!("Skipped {} duplicates", report.skipped_duplicates);

    for unmatched in &report.unmatched_employees {
        println!("Unmatched name '{}' ({} shifts)", unmatched.name, unmatched.shifts.len());
    }
    for row in &report.unmatched_rows {
        println!("Unmatched row on page {} ({:?}): {}", row.page, row.reason, row.text);
    }
    for error in &report.errors {
        println!("Error: {}", error);
    }
    if let ImportStatus::DatabaseError { message } = &report.status {
        println!("Import stopped: {}", message);
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_import(
    fragments: &Path,
    employees: &Path,
    store_path: &Path,
    dry_run: bool,
    config: Option<&Path>,
    reference_date: Option<NaiveDate>,
    format: OutputFormat,
) -> Result<bool> {
    let config = load_config(config)?;

    let ocr = PrecomputedOcr::from_file(fragments)
        .with_context(|| format!("Failed to read fragments from {}", fragments.display()))?;
    let directory = InMemoryDirectory::from_json_file(employees)
        .with_context(|| format!("Failed to read employees from {}", employees.display()))?;
    let store = InMemoryShiftStore::load(store_path)
        .with_context(|| format!("Failed to read shifts from {}", store_path.display()))?;

    ocr.initialize()?;
    directory.initialize()?;
    store.initialize()?;

    tracing::info!(
        "Importing {} pages from {} ({} shifts on file{})",
        ocr.page_count(),
        fragments.display(),
        store.len(),
        if dry_run { ", dry run" } else { "" }
    );

    let options = ImportOptions {
        dry_run,
        reference_date,
    };
    let report = import_document(&ocr.page_images(), &ocr, &directory, &store, &options, &config).await?;

    if let ImportStatus::DatabaseError { message } = &report.status {
        tracing::error!("Import stopped by the shift store: {}", message);
    }

    if !dry_run {
        store
            .save(store_path)
            .with_context(|| format!("Failed to write shifts to {}", store_path.display()))?;
        tracing::info!("Wrote {} shifts to {}", store.len(), store_path.display());
    }

    store.shutdown()?;
    directory.shutdown()?;
    ocr.shutdown()?;

    match format {
        OutputFormat::Text => print_report(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(!report.is_database_error())
}

fn run_parse_cell(text: &str, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;

    match parse_time_cell(text, &config.time) {
        ParseOutcome::Matched(range) => {
            let overnight = if range.is_overnight() { " (overnight)" } else { "" };
            println!("{}-{}{}", range.start.format("%H:%M"), range.end.format("%H:%M"), overnight);
        }
        ParseOutcome::Fallback(raw) => println!("unparsed, kept for review: {}", raw),
        ParseOutcome::Off => println!("off"),
        ParseOutcome::NoMatch => println!("nothing usable"),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Import {
            fragments,
            employees,
            store,
            dry_run,
            config,
            reference_date,
            format,
        } => {
            let completed = run_import(
                &fragments,
                &employees,
                &store,
                dry_run,
                config.as_deref(),
                reference_date,
                format,
            )
            .await?;
            if !completed {
                std::process::exit(2);
            }
        }
        Commands::ParseCell { text, config } => run_parse_cell(&text, config.as_deref())?,
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            config.validate()?;
            print!("{}", toml::to_string_pretty(&config).context("Failed to serialize config")?);
        }
    }

    Ok(())
}

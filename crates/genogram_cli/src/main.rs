//! Command-line document migrator.
//!
//! # Responsibility
//! - Load one genogram document, migrate it and report what changed.
//! - Write the migrated document back, stamped with the current version.
//!
//! # Invariants
//! - A document that failed to migrate is never written.
//! - `--dry-run` never touches the filesystem except for logs.

use anyhow::{Context, Result};
use clap::Parser;
use genogram_compat::{
    default_log_level, init_logging_with, load_document_file, save_document_file,
    LoadedDocument, LoggingConfig, MigrateOptions, CURRENT_VERSION,
};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "genogram-migrate")]
#[command(about = "Upgrade a saved genogram document to the current format", long_about = None)]
struct Cli {
    /// Document to migrate
    input: PathBuf,

    /// Where to write the result (defaults to overwriting INPUT)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report what would change without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Migrate documents stamped newer than this build
    #[arg(long)]
    allow_future: bool,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, env = "GENOGRAM_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files
    #[arg(long, env = "GENOGRAM_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    start_logging(&cli)?;

    let options = MigrateOptions {
        allow_future_versions: cli.allow_future,
        ..MigrateOptions::default()
    };
    let mut loaded = load_document_file(&cli.input, &options)?;
    print_report(&loaded);

    if cli.dry_run {
        println!("dry run: nothing written");
        return Ok(());
    }

    let output = cli.output.as_ref().unwrap_or(&cli.input);
    save_document_file(output, &mut loaded.document)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        "event=cli_migrate module=cli status=ok input={} output={}",
        cli.input.display(),
        output.display()
    );
    println!("wrote {} (version {})", output.display(), CURRENT_VERSION);
    Ok(())
}

fn start_logging(cli: &Cli) -> Result<()> {
    let log_dir = match &cli.log_dir {
        Some(dir) => dir.clone(),
        None => std::env::temp_dir().join("genogram-migrate"),
    };
    let log_dir = log_dir
        .to_str()
        .with_context(|| format!("log directory {} is not UTF-8", log_dir.display()))?
        .to_string();
    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    let config = LoggingConfig::new(level, &log_dir)?.with_echo_warnings(true);
    init_logging_with(config).context("failed to start logging")
}

fn print_report(loaded: &LoadedDocument) {
    let report = &loaded.report;
    println!(
        "document version: {}",
        report.document_version.as_deref().unwrap_or("none")
    );
    if report.applied.is_empty() {
        println!("already current; no steps applied");
    }
    for step in &report.applied {
        println!("applied  {step}");
    }
    for step in &report.skipped {
        println!("skipped  {step}");
    }
    if report.minted_ids > 0 {
        println!("minted {} new ids", report.minted_ids);
    }
    for warning in &report.warnings {
        println!("warning: {warning}");
    }
    for issue in &loaded.issues {
        println!("integrity: {issue}");
    }
}

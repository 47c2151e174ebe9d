mod config;
mod runner;

use crate::config::RunConfig;
use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Runs an epidemic simulation or climate sweep described by a TOML file and
/// writes the resulting table as CSV.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[arg(long)]
    config: PathBuf,

    /// Write the table here instead of standard output.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log peak, final values and R0 after the run.
    #[arg(long)]
    summary: bool,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = Cli::parse();
    log::debug!("{args:#?}");

    let config = RunConfig::from_file(&args.config).context("failed to load run config")?;
    let report = runner::execute(&config)?;

    let csv = report.table.to_csv();
    match &args.output {
        Some(path) => {
            fs::write(path, csv).with_context(|| format!("failed to write {path:?}"))?;
            log::info!("wrote {} rows to {path:?}", report.table.len());
        }
        None => std::io::stdout()
            .lock()
            .write_all(csv.as_bytes())
            .context("failed to write table")?,
    }

    if args.summary {
        runner::log_summary(&report);
    }

    Ok(())
}

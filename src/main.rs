mod config;
mod dates;
mod error;
mod loader;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;
use crate::loader::read_case_ids;
use crate::models::CaseRow;
use crate::pipeline::{LookupMode, Pipeline};
use crate::scraper::cleaner::normalize;
use crate::scraper::driver::WebDriverLauncher;
use crate::storage::{sidecar_path, write_case_ids, write_cases, write_raw_rows};

#[derive(Parser)]
#[command(
    name = "eviction-scraper",
    about = "Scrape eviction filings from the county clerk's court records site",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape every eviction filed between two dates (mmddyyyy, inclusive)
    Scrape {
        /// CSV file to write
        output: PathBuf,
        #[arg(value_parser = dates::parse_mmddyyyy)]
        start: NaiveDate,
        #[arg(value_parser = dates::parse_mmddyyyy)]
        end: NaiveDate,
    },

    /// Re-visit known case numbers, e.g. from a previous run's failed list
    Lookup {
        /// CSV file to write
        output: PathBuf,

        /// One case number per line, or any CSV whose first column is case_id
        #[arg(long)]
        ids_file: PathBuf,

        /// Read every field instead of only the disposition
        #[arg(long)]
        full: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "eviction_scraper=info,warn",
        1 => "eviction_scraper=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let launcher = WebDriverLauncher::new(&config.site, &config.browser);
    let mut pipeline = Pipeline::new(config, launcher);

    match cli.command {
        Command::Scrape { output, start, end } => {
            let _t = utils::Timer::start(format!("Scrape {} → {}", start, end));
            let report = pipeline.run(start, end, dates::today()).await?;

            let written = save(&output, report.rows, &report.failed_cases)?;

            println!("─────────────────────────────────");
            println!("  Ranges done   : {}", report.completed.len());
            println!("  Cases written : {}", written);
            println!("  Unparsable    : {}", report.failed_cases.len());
            if report.unidentified_cases > 0 {
                println!("  No case no.   : {} (not in the failed list)", report.unidentified_cases);
            }
            println!("  Restarts      : {}", report.restarts);
            if let Some(failure) = &report.aborted {
                println!("  Stopped at    : {} ({})", failure.range, failure.error);
            }
            println!("─────────────────────────────────");

            if let Some(failure) = report.aborted {
                anyhow::bail!("run stopped at {}: {}", failure.range, failure.error);
            }
        }

        Command::Lookup { output, ids_file, full } => {
            let _t = utils::Timer::start("Case lookup");
            let ids = read_case_ids(&ids_file)?;
            if ids.is_empty() {
                warn!("No case numbers in {:?}, nothing to do", ids_file);
                return Ok(());
            }

            let mode = if full { LookupMode::Full } else { LookupMode::DispositionOnly };
            let report = pipeline.lookup(&ids, mode).await?;

            let written = save(&output, report.rows, &report.failed_cases)?;
            println!("{} of {} cases written to {:?}", written, ids.len(), output);

            if let Some((id, reason)) = report.aborted {
                anyhow::bail!("lookup stopped at case {}: {}", id, reason);
            }
        }
    }

    Ok(())
}

/// Normalize and write the rows a command collected, plus the failed-case
/// sidecar. Raw rows are kept on disk when normalization fails.
fn save(output: &Path, rows: Vec<CaseRow>, failed_cases: &[String]) -> Result<usize> {
    if !failed_cases.is_empty() {
        let path = sidecar_path(output, ".failed.txt");
        write_case_ids(&path, failed_cases)?;
        info!("Retry them with: eviction-scraper lookup <OUTPUT> --ids-file {:?} --full", path);
    }

    match normalize(rows.clone(), dates::today()) {
        Ok(cases) => write_cases(output, &cases),
        Err(e) => {
            let raw = sidecar_path(output, ".raw.csv");
            error!("Normalization failed ({}); keeping raw rows in {:?}", e, raw);
            write_raw_rows(&raw, &rows)?;
            Err(e).context("rows could not be normalized")
        }
    }
}

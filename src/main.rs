//! # Filings Harvest
//!
//! A collector for securities-litigation filings from the Stanford Securities
//! Class Action Clearinghouse (SCAC), with a companion pipeline that indexes
//! and downloads 10-K reports from SEC EDGAR.
//!
//! ## Features
//!
//! - Walks the SCAC `filings.json` listing page by page, stopping on an empty
//!   page, a repeated page, the reported last page, or a page limit
//! - Drops records whose `cld_id` was already emitted
//! - Rewrites `new Date(<ms>)` literals anywhere in a record to ISO-8601
//! - Writes JSON Lines (optionally with the per-case JSON embedded) or a CSV
//!   table enriched from the HTML case pages
//! - Builds a ticker directory and a 10-K index from EDGAR and downloads the
//!   listed documents, skipping files already on disk
//!
//! ## Usage
//!
//! ```sh
//! filings_harvest filings -o data/filings.jsonl --max-pages 0
//! filings_harvest sec-all --tickers AAPL,MSFT
//! ```
//!
//! ## Architecture
//!
//! 1. **Session**: log in (or just prime cookies) with [`scrapers::scac`]
//! 2. **Walk**: [`walker::FilingsWalker`] drives any [`walker::PageSource`]
//! 3. **Normalize**: [`normalize::normalize_record`] fixes date literals
//! 4. **Output**: [`outputs::jsonl`] or [`outputs::table`]
//!
//! Requests are made one at a time; a politeness delay separates them.

use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod commands;
mod config;
mod error;
mod models;
mod normalize;
mod outputs;
mod scrapers;
mod utils;
mod walker;

use cli::Cli;
use config::AppConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Cli::parse();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "filings_harvest starting up");
    debug!(?args, "Parsed CLI arguments");

    let outcome = match AppConfig::load(args.config.as_deref()).await {
        Ok(config) => commands::dispatch(&config, &args.command).await,
        Err(e) => Err(e),
    };

    let elapsed = start_time.elapsed();
    match outcome {
        Ok(()) => {
            info!(
                ?elapsed,
                secs = elapsed.as_secs(),
                millis = elapsed.subsec_millis(),
                "Execution complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, transport = e.is_transport(), ?elapsed, "Execution failed");
            ExitCode::FAILURE
        }
    }
}

//! Command-line interface definitions for Filings Harvest.
//!
//! This module defines the CLI arguments and subcommands using the `clap`
//! crate. Credentials can be provided via flags or environment variables.

use crate::scrapers::scac::FetchMethod;
use crate::utils::parse_key_value;
use crate::walker::DEFAULT_MAX_FETCHES;
use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the Filings Harvest application.
///
/// # Examples
///
/// ```sh
/// # First page of SCAC filings, no login
/// filings_harvest filings -o data/filings.jsonl
///
/// # Every page as CSV, logged in, with case-page enrichment
/// SCAC_EMAIL=me@uni.edu SCAC_PASSWORD=... filings_harvest filings -o data/filings.csv --max-pages 0
///
/// # Whole SEC pipeline for two tickers
/// filings_harvest --config harvest.yaml sec-all --tickers AAPL,MSFT
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file (user agents, timeouts, base URLs)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set (e.g. "debug", "filings_harvest=trace")
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Walk the SCAC filings listing and save it as JSON Lines or CSV
    Filings(FilingsArgs),
    /// Run one SCAC advanced search and print page 1 as JSON Lines
    Search(SearchArgs),
    /// Download the SEC company ticker directory
    SecDirectory(SecDirectoryArgs),
    /// Build the 10-K index for companies in the directory
    SecIndex(SecIndexArgs),
    /// Download every 10-K document listed in the index
    SecDownload(SecDownloadArgs),
    /// Run directory, index, and download in sequence
    SecAll(SecAllArgs),
}

/// SCAC account credentials.
#[derive(Args, Debug, Clone, Default)]
pub struct ScacAuthArgs {
    /// Account email
    #[arg(long, env = "SCAC_EMAIL")]
    pub email: Option<String>,

    /// Account password
    #[arg(long, env = "SCAC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct FilingsArgs {
    #[command(flatten)]
    pub auth: ScacAuthArgs,

    /// Destination file; a `.csv` extension selects the table format, anything else JSON Lines
    #[arg(short, long, default_value = "data/filings.jsonl")]
    pub output: PathBuf,

    /// Maximum filings pages to retrieve (0 = no limit)
    #[arg(long, default_value_t = 1)]
    pub max_pages: usize,

    /// Hard cap on listing requests, for servers whose pagination never ends
    #[arg(long, default_value_t = DEFAULT_MAX_FETCHES, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub max_fetches: usize,

    /// Fetch filings-case.json for each cld_id and embed it under `case_detail` (JSON Lines only)
    #[arg(long)]
    pub with_details: bool,

    /// Seconds to pause between requests
    #[arg(long, default_value = "0.5", value_parser = parse_seconds)]
    pub sleep: Duration,

    /// Extra listing form field, repeatable (e.g. `--filter yearFrom=2001`)
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub filters: Vec<(String, String)>,

    /// HTTP method for the listing endpoint
    #[arg(long, value_enum, default_value_t = FetchMethod::Post)]
    pub method: FetchMethod,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub auth: ScacAuthArgs,

    /// Search field, repeatable (e.g. `--filter "claims[]=1934 act claims - section 10b"`)
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub filters: Vec<(String, String)>,
}

#[derive(Args, Debug, Clone)]
pub struct SecDirectoryArgs {
    /// Destination CSV
    #[arg(short, long, default_value = "data/tickers.csv")]
    pub output: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct SecIndexArgs {
    /// Company directory CSV produced by `sec-directory`
    #[arg(long, default_value = "data/tickers.csv")]
    pub tickers_csv: PathBuf,

    /// Destination CSV
    #[arg(short, long, default_value = "data/tenk_index.csv")]
    pub output: PathBuf,

    /// Only these tickers (comma separated); all companies when omitted
    #[arg(long, value_delimiter = ',')]
    pub tickers: Vec<String>,

    /// Include 10-K/A amendments
    #[arg(long)]
    pub include_amends: bool,

    /// Seconds to pause between companies
    #[arg(long, default_value = "0.6", value_parser = parse_seconds)]
    pub sleep: Duration,
}

#[derive(Args, Debug, Clone)]
pub struct SecDownloadArgs {
    /// Index CSV with a `tenk_url` column
    #[arg(long, default_value = "data/tenk_index.csv")]
    pub csv: PathBuf,

    /// Directory for downloaded documents
    #[arg(long, default_value = "data/tenk_filings")]
    pub out: PathBuf,

    /// Seconds to pause after each download
    #[arg(long, default_value = "0.6", value_parser = parse_seconds)]
    pub sleep: Duration,
}

#[derive(Args, Debug, Clone)]
pub struct SecAllArgs {
    /// Base directory for every stage's output
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Only these tickers (comma separated); all companies when omitted
    #[arg(long, value_delimiter = ',')]
    pub tickers: Vec<String>,

    /// Include 10-K/A amendments
    #[arg(long)]
    pub include_amends: bool,

    /// Seconds to pause between SEC requests
    #[arg(long, default_value = "0.6", value_parser = parse_seconds)]
    pub sleep: Duration,
}

/// Parse a non-negative number of seconds.
pub fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("expected seconds, got {s:?}"))?;
    Duration::try_from_secs_f64(secs).map_err(|_| format!("invalid delay {s:?}"))
}

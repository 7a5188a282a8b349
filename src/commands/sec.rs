//! SEC EDGAR stages: company directory, 10-K index, and document download.
//!
//! Each stage reads the previous stage's CSV, so they can be run one at a
//! time or chained with [`run_all`].

use crate::cli::{SecAllArgs, SecDownloadArgs, SecIndexArgs};
use crate::config::AppConfig;
use crate::error::Result;
use crate::models::{CompanyTicker, TenKEntry};
use crate::outputs::table::{read_table, write_table};
use crate::scrapers::edgar::EdgarClient;
use crate::utils::{ensure_parent_dir, ensure_writable_dir, pause, safe_filename};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Tally of one download run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub saved: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Fetch the ticker directory and write it to `output`.
#[instrument(level = "info", skip_all, fields(output = %output.display()))]
pub async fn run_directory(config: &AppConfig, output: &Path) -> Result<usize> {
    let client = EdgarClient::new(&config.sec)?;
    let companies = client.fetch_company_directory().await?;
    ensure_parent_dir(output).await?;
    let written = write_table(output, &CompanyTicker::HEADER, &companies)?;
    info!(written, "Saved company directory");
    Ok(written)
}

/// Build the 10-K index for the directory in `args.tickers_csv`.
///
/// A company whose submissions cannot be fetched contributes no rows. Nothing
/// is written when no filings were found at all.
#[instrument(level = "info", skip_all, fields(output = %args.output.display()))]
pub async fn run_index(config: &AppConfig, args: &SecIndexArgs) -> Result<usize> {
    let client = EdgarClient::new(&config.sec)?;
    let directory: Vec<CompanyTicker> = read_table(&args.tickers_csv)?;
    let companies = select_companies(directory, &args.tickers);
    info!(companies = companies.len(), "Indexing 10-K filings");

    let mut rows = Vec::new();
    for company in &companies {
        let cik = format!("{:0>10}", company.cik.trim());
        match client.list_10k_for_cik(&cik, args.include_amends).await {
            Ok(entries) => rows.extend(entries.into_iter().map(|entry| TenKEntry {
                ticker: company.ticker.clone(),
                company: company.name.clone(),
                ..entry
            })),
            Err(e) if e.is_recoverable() => {
                warn!(ticker = %company.ticker, %cik, error = %e, "Submissions unavailable; skipping company");
            }
            Err(e) => return Err(e),
        }
        pause(args.sleep).await;
    }

    if rows.is_empty() {
        warn!("No 10-K records found; index not written");
        return Ok(0);
    }

    rows.sort_by(|a, b| {
        (a.ticker.as_str(), a.filing_date.as_str()).cmp(&(b.ticker.as_str(), b.filing_date.as_str()))
    });
    ensure_parent_dir(&args.output).await?;
    let written = write_table(&args.output, &TenKEntry::HEADER, &rows)?;
    info!(written, "Saved 10-K index");
    Ok(written)
}

/// Download every document listed in `args.csv` into `args.out`.
///
/// Files already on disk are left alone; a failed download is logged and
/// the run moves on.
#[instrument(level = "info", skip_all, fields(out = %args.out.display()))]
pub async fn run_download(config: &AppConfig, args: &SecDownloadArgs) -> Result<DownloadSummary> {
    let entries: Vec<TenKEntry> = read_table(&args.csv)?;
    let entries: Vec<TenKEntry> = entries
        .into_iter()
        .filter(|e| !e.tenk_url.trim().is_empty())
        .collect();

    let mut summary = DownloadSummary::default();
    if entries.is_empty() {
        info!("No 10-K URLs to download");
        return Ok(summary);
    }

    let client = EdgarClient::new(&config.sec)?;
    ensure_writable_dir(&args.out).await?;

    for entry in &entries {
        let url = entry.tenk_url.trim();
        let target = args.out.join(build_filename(entry));
        if tokio::fs::try_exists(&target).await? {
            info!(path = %target.display(), "Already downloaded; skipping");
            summary.skipped += 1;
            continue;
        }
        match client.download_to(url, &target).await {
            Ok(bytes) => {
                info!(path = %target.display(), bytes, "Saved 10-K");
                summary.saved += 1;
                pause(args.sleep).await;
            }
            Err(e) if e.is_recoverable() => {
                warn!(%url, error = %e, "Download failed");
                summary.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        saved = summary.saved,
        skipped = summary.skipped,
        failed = summary.failed,
        "Download complete"
    );
    Ok(summary)
}

/// Directory, index, and download in one go, all under `args.data_dir`.
#[instrument(level = "info", skip_all, fields(data_dir = %args.data_dir.display()))]
pub async fn run_all(config: &AppConfig, args: &SecAllArgs) -> Result<DownloadSummary> {
    let paths = PipelinePaths::under(&args.data_dir);

    run_directory(config, &paths.tickers).await?;
    let indexed = run_index(
        config,
        &SecIndexArgs {
            tickers_csv: paths.tickers.clone(),
            output: paths.index.clone(),
            tickers: args.tickers.clone(),
            include_amends: args.include_amends,
            sleep: args.sleep,
        },
    )
    .await?;
    if indexed == 0 {
        return Ok(DownloadSummary::default());
    }
    run_download(
        config,
        &SecDownloadArgs {
            csv: paths.index,
            out: paths.documents,
            sleep: args.sleep,
        },
    )
    .await
}

struct PipelinePaths {
    tickers: PathBuf,
    index: PathBuf,
    documents: PathBuf,
}

impl PipelinePaths {
    fn under(dir: &Path) -> Self {
        Self {
            tickers: dir.join("tickers.csv"),
            index: dir.join("tenk_index.csv"),
            documents: dir.join("tenk_filings"),
        }
    }
}

/// Restrict the directory to `wanted` tickers (case-insensitive); all of it
/// when `wanted` is empty.
pub fn select_companies(directory: Vec<CompanyTicker>, wanted: &[String]) -> Vec<CompanyTicker> {
    let wanted: HashSet<String> = wanted
        .iter()
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    if wanted.is_empty() {
        return directory;
    }
    directory
        .into_iter()
        .filter(|c| wanted.contains(&c.ticker.to_uppercase()))
        .collect()
}

/// `{TICKER}_{filing_date}_{primary_doc}`, each part made file-name safe.
///
/// Missing parts become `UNKNOWN`, `no_date`, and the last URL segment.
pub fn build_filename(entry: &TenKEntry) -> String {
    let ticker = non_empty(&entry.ticker)
        .map(str::to_uppercase)
        .unwrap_or_else(|| "UNKNOWN".to_string());
    let filing_date = non_empty(&entry.filing_date).unwrap_or("no_date");
    let primary_doc = non_empty(&entry.primary_doc).unwrap_or_else(|| {
        entry
            .tenk_url
            .trim()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    });
    format!(
        "{}_{}_{}",
        safe_filename(&ticker),
        safe_filename(filing_date),
        safe_filename(primary_doc)
    )
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

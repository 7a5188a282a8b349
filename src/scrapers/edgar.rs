//! SEC EDGAR client: company directory, 10-K listings, and document downloads.
//!
//! # Endpoints
//!
//! - `https://www.sec.gov/files/company_tickers.json`: every registrant with a
//!   ticker, keyed by row number
//! - `https://data.sec.gov/submissions/CIK##########.json`: a company's filing
//!   history; the newest filings are inlined under `filings.recent` as
//!   parallel arrays, older ones are split into files listed under
//!   `filings.files`
//! - `https://www.sec.gov/Archives/edgar/data/{cik}/{accession}/{doc}`: the
//!   filed documents themselves
//!
//! SEC rejects requests without a contactable `User-Agent`; set one in the
//! config file.

use crate::config::HttpConfig;
use crate::error::{Result, ScrapeError};
use crate::models::{CompanyTicker, TenKEntry};
use crate::utils::truncate_for_log;
use itertools::Itertools;
use reqwest::Response;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// One 10-K row before URL building: `(accession, primary_doc, filing_date)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFiling {
    pub accession: String,
    pub primary_doc: String,
    pub filing_date: String,
}

#[derive(Debug)]
pub struct EdgarClient {
    http: reqwest::Client,
    base_url: Url,
    api_base_url: Url,
}

impl EdgarClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let parse = |s: String| {
            Url::parse(&s).map_err(|e| ScrapeError::Config(format!("invalid SEC URL {s:?}: {e}")))
        };
        Ok(Self {
            http: config.build_client()?,
            base_url: parse(config.normalized_base_url())?,
            api_base_url: parse(config.normalized_api_base_url())?,
        })
    }

    async fn send(&self, url: &Url) -> Result<Response> {
        self.http
            .get(url.clone())
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| ScrapeError::transport(url.as_str(), e))
    }

    async fn get_json(&self, url: &Url) -> Result<Value> {
        let text = self
            .send(url)
            .await?
            .text()
            .await
            .map_err(|e| ScrapeError::transport(url.as_str(), e))?;
        serde_json::from_str(&text).map_err(|e| {
            ScrapeError::malformed(
                url.as_str(),
                format!("invalid JSON ({e}): {}", truncate_for_log(&text, 200)),
            )
        })
    }

    fn join(base: &Url, path: &str) -> Result<Url> {
        base.join(path)
            .map_err(|e| ScrapeError::Config(format!("cannot join {path:?}: {e}")))
    }

    /// Download and parse the ticker directory, sorted by ticker.
    #[instrument(level = "info", skip_all)]
    pub async fn fetch_company_directory(&self) -> Result<Vec<CompanyTicker>> {
        let url = Self::join(&self.base_url, "files/company_tickers.json")?;
        let body = self.get_json(&url).await?;
        let companies = parse_company_directory(url.as_str(), &body)?;
        info!(count = companies.len(), "Fetched company directory");
        Ok(companies)
    }

    /// Every 10-K (and optionally 10-K/A) filed by one company.
    ///
    /// The inline `recent` block must load; a historical file that fails is
    /// logged and skipped.
    #[instrument(level = "info", skip(self))]
    pub async fn list_10k_for_cik(&self, cik_10: &str, include_amends: bool) -> Result<Vec<TenKEntry>> {
        let url = Self::join(&self.api_base_url, &format!("submissions/CIK{cik_10}.json"))?;
        let payload = self.get_json(&url).await?;

        let mut collected = match payload.pointer("/filings/recent") {
            Some(recent) => collect_columnar(recent, include_amends),
            None => Vec::new(),
        };
        debug!(count = collected.len(), "Matched recent filings");

        for name in historical_file_names(&payload) {
            let hist_url = Self::join(&self.api_base_url, &format!("submissions/{name}"))?;
            debug!(url = %hist_url, "Fetching historical page");
            match self.get_json(&hist_url).await {
                Ok(hist) => collected.extend(collect_historical(&hist, include_amends)),
                Err(e) => warn!(url = %hist_url, error = %e, "Historical page failed; skipping"),
            }
        }

        let entries = build_tenk_entries(cik_10, collected, &self.base_url);
        info!(count = entries.len(), "Collected 10-K filings");
        Ok(entries)
    }

    /// Fetch `url` and write the body to `target`, creating parent directories.
    #[instrument(level = "debug", skip(self))]
    pub async fn download_to(&self, url: &str, target: &Path) -> Result<u64> {
        let parsed = Url::parse(url).map_err(|e| ScrapeError::malformed(url, format!("bad URL: {e}")))?;
        let bytes = self
            .send(&parsed)
            .await?
            .bytes()
            .await
            .map_err(|e| ScrapeError::transport(url, e))?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(target, &bytes).await?;
        Ok(bytes.len() as u64)
    }
}

/// Turn `company_tickers.json` into sorted directory rows.
///
/// Entries missing a field, or with a non-numeric CIK, are logged and skipped.
/// A body with no usable entries is an error.
pub fn parse_company_directory(url: &str, body: &Value) -> Result<Vec<CompanyTicker>> {
    let Value::Object(entries) = body else {
        return Err(ScrapeError::malformed(url, "ticker directory is not a JSON object"));
    };

    let mut rows = Vec::with_capacity(entries.len());
    for (key, item) in entries {
        match parse_company(item) {
            Some(row) => rows.push(row),
            None => warn!(%key, "Skipping directory entry with missing or malformed fields"),
        }
    }

    if rows.is_empty() {
        return Err(ScrapeError::malformed(url, "no company records could be parsed"));
    }
    rows.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    Ok(rows)
}

fn parse_company(item: &Value) -> Option<CompanyTicker> {
    let ticker = item.get("ticker")?.as_str()?.to_uppercase();
    let cik: u64 = match item.get("cik_str")? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    let name = item.get("title")?.as_str()?.to_string();
    Some(CompanyTicker {
        ticker,
        cik: format!("{cik:010}"),
        name,
    })
}

fn is_wanted_form(form: &str, include_amends: bool) -> bool {
    form == "10-K" || (include_amends && form == "10-K/A")
}

/// Read a columnar block (`{"form": [...], "accessionNumber": [...], ...}`).
pub fn collect_columnar(block: &Value, include_amends: bool) -> Vec<RawFiling> {
    fn column<'a>(block: &'a Value, name: &str) -> &'a [Value] {
        block
            .get(name)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
    let cell = |col: &[Value], idx: usize| {
        col.get(idx)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let forms = column(block, "form");
    let accessions = column(block, "accessionNumber");
    let docs = column(block, "primaryDocument");
    let dates = column(block, "filingDate");

    forms
        .iter()
        .enumerate()
        .filter(|(_, form)| form.as_str().is_some_and(|f| is_wanted_form(f, include_amends)))
        .filter_map(|(idx, _)| {
            let accession = cell(accessions, idx);
            if accession.is_empty() {
                return None;
            }
            Some(RawFiling {
                accession,
                primary_doc: cell(docs, idx),
                filing_date: cell(dates, idx),
            })
        })
        .collect()
}

/// Read a historical submissions file.
///
/// SEC serves these in the same columnar layout as `filings.recent`; a
/// `filings` array of row objects is accepted too.
pub fn collect_historical(payload: &Value, include_amends: bool) -> Vec<RawFiling> {
    if let Some(rows) = payload.get("filings").and_then(Value::as_array) {
        let text = |row: &Value, key: &str| {
            row.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        return rows
            .iter()
            .filter(|row| {
                row.get("form")
                    .and_then(Value::as_str)
                    .is_some_and(|f| is_wanted_form(f, include_amends))
            })
            .map(|row| RawFiling {
                accession: text(row, "accessionNumber"),
                primary_doc: text(row, "primaryDocument"),
                filing_date: text(row, "filingDate"),
            })
            .collect();
    }
    collect_columnar(payload, include_amends)
}

/// Names listed under `filings.files[].name`.
pub fn historical_file_names(payload: &Value) -> Vec<String> {
    payload
        .pointer("/filings/files")
        .and_then(Value::as_array)
        .map(|files| {
            files
                .iter()
                .filter_map(|f| f.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Deduplicate on `(accession, primary_doc)` and attach archive URLs.
pub fn build_tenk_entries(cik_10: &str, raw: Vec<RawFiling>, base_url: &Url) -> Vec<TenKEntry> {
    let cik_plain = cik_10
        .parse::<u64>()
        .map(|n| n.to_string())
        .unwrap_or_else(|_| cik_10.trim_start_matches('0').to_string());
    let base = base_url.as_str().trim_end_matches('/');

    raw.into_iter()
        .unique_by(|f| (f.accession.clone(), f.primary_doc.clone()))
        .map(|f| {
            let accession_compact = f.accession.replace('-', "");
            TenKEntry {
                cik: cik_10.to_string(),
                tenk_url: format!(
                    "{base}/Archives/edgar/data/{cik_plain}/{accession_compact}/{}",
                    f.primary_doc
                ),
                accession: f.accession,
                filing_date: f.filing_date,
                primary_doc: f.primary_doc,
                ticker: String::new(),
                company: String::new(),
            }
        })
        .collect()
}

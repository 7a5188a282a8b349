//! `filings` and `search`: SCAC listing exports.

use crate::cli::{FilingsArgs, ScacAuthArgs, SearchArgs};
use crate::config::AppConfig;
use crate::error::Result;
use crate::models::{CaseDetails, FilingRow, Record};
use crate::normalize::normalize_record;
use crate::outputs::jsonl::JsonLinesWriter;
use crate::outputs::table::TableWriter;
use crate::scrapers::scac::{Credentials, ScacClient, cld_id_param};
use crate::utils::{ensure_parent_dir, pause, value_to_cell};
use crate::walker::{FilingsWalker, WalkerOptions};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Listing field holding the case name.
const NAME_FIELD: &str = "composite_litigation_name";
/// Listing field holding the filing date (a `new Date(ms)` literal before normalizing).
const DATE_FIELD: &str = "cld_fic_filing_long_date";
/// Listing field holding the court id, used when the case page is unavailable.
const COURT_FALLBACK_FIELD: &str = "courts_lut_id";

/// Walk the listing and write every unique filing to `args.output`.
#[instrument(level = "info", skip_all, fields(output = %args.output.display()))]
pub async fn run_filings(config: &AppConfig, args: &FilingsArgs) -> Result<usize> {
    let client = ScacClient::new(&config.scac, credentials(&args.auth))?
        .with_filters(args.filters.clone())
        .with_method(args.method);
    let (client, authenticated) = open_session(client).await?;

    let mut options = WalkerOptions::default()
        .max_pages(Some(args.max_pages))
        .max_fetches(args.max_fetches)
        .delay(args.sleep);
    if !authenticated {
        warn!("No credentials; SCAC only serves page 1 to anonymous sessions");
        options = options.first_page_only();
    }

    ensure_parent_dir(&args.output).await?;
    let mut walker = FilingsWalker::new(&client, options);

    let written = if is_csv(&args.output) {
        if args.with_details {
            warn!("--with-details only applies to JSON Lines output; the table uses case pages");
        }
        write_table(&client, &mut walker, &args.output, args.sleep).await?
    } else {
        write_jsonl(&client, &mut walker, &args.output, args.with_details, args.sleep).await?
    };

    info!(
        written,
        emitted = walker.records_emitted(),
        pages = walker.pages_seen(),
        duplicates = walker.duplicates_skipped(),
        stop = ?walker.stop_reason(),
        "Saved filings"
    );
    Ok(written)
}

/// Run one advanced search and print the normalized page to stdout.
#[instrument(level = "info", skip_all)]
pub async fn run_search(config: &AppConfig, args: &SearchArgs) -> Result<usize> {
    let client = ScacClient::new(&config.scac, credentials(&args.auth))?;
    let (client, _) = open_session(client).await?;

    let page = client.perform_advanced_search(&args.filters).await?;
    info!(
        records = page.records.len(),
        current = ?page.pagination.current_index(),
        last = ?page.pagination.last_index(),
        "Search complete"
    );

    let mut writer = JsonLinesWriter::new(tokio::io::stdout());
    for record in &page.records {
        writer.write_record(&normalize_record(record)).await?;
    }
    writer.finish().await
}

fn credentials(auth: &ScacAuthArgs) -> Option<Credentials> {
    Credentials::from_parts(auth.email.clone(), auth.password.clone())
}

/// Log in when credentials are present, otherwise just prime cookies.
async fn open_session(mut client: ScacClient) -> Result<(ScacClient, bool)> {
    if client.has_credentials() {
        client.login().await?;
    } else {
        client.bootstrap().await?;
    }
    let authenticated = client.is_authenticated();
    Ok((client, authenticated))
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

async fn write_jsonl(
    client: &ScacClient,
    walker: &mut FilingsWalker<'_, ScacClient>,
    path: &Path,
    with_details: bool,
    sleep: Duration,
) -> Result<usize> {
    let mut writer = JsonLinesWriter::create(path).await?;
    while let Some(record) = walker.next().await? {
        let mut normalized = normalize_record(&record);
        if with_details {
            attach_case_detail(client, &record, &mut normalized).await?;
            pause(sleep).await;
        }
        writer.write_record(&normalized).await?;
    }
    writer.finish().await
}

/// Embed the normalized case JSON under `case_detail`. Recoverable failures
/// leave the record as is.
async fn attach_case_detail(client: &ScacClient, raw: &Record, out: &mut Record) -> Result<()> {
    let Some(id) = cld_id_param(raw) else {
        return Ok(());
    };
    match client.fetch_case_detail(&id).await {
        Ok(detail) => {
            out.insert("case_detail".to_string(), Value::Object(normalize_record(&detail)));
        }
        Err(e) if e.is_recoverable() => {
            warn!(cld_id = %id, error = %e, "Case detail unavailable; keeping listing record only");
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

async fn write_table(
    client: &ScacClient,
    walker: &mut FilingsWalker<'_, ScacClient>,
    path: &Path,
    sleep: Duration,
) -> Result<usize> {
    let mut writer = TableWriter::create(path, &FilingRow::HEADER)?;
    while let Some(record) = walker.next().await? {
        let normalized = normalize_record(&record);
        let details = match cld_id_param(&record) {
            Some(id) => {
                let details = case_details(client, &id).await?;
                pause(sleep).await;
                details
            }
            None => Some(CaseDetails::default()),
        };
        writer.write_row(&filing_row(&normalized, details))?;
    }
    writer.finish()
}

async fn case_details(client: &ScacClient, id: &str) -> Result<Option<CaseDetails>> {
    match client.fetch_case_details_from_html(id).await {
        Ok(details) => Ok(Some(details)),
        Err(e) if e.is_recoverable() => {
            warn!(cld_id = %id, error = %e, "Case page unavailable; falling back to listing fields");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Flatten a normalized record into a table row.
///
/// `None` means the case page could not be fetched: the court column falls
/// back to the listing's court id and exchange and ticker stay empty.
pub fn filing_row(record: &Record, details: Option<CaseDetails>) -> FilingRow {
    let details = details.unwrap_or_else(|| CaseDetails {
        court: value_to_cell(record.get(COURT_FALLBACK_FIELD)),
        ..CaseDetails::default()
    });
    FilingRow {
        filing_name: value_to_cell(record.get(NAME_FIELD)),
        filing_date: value_to_cell(record.get(DATE_FIELD)),
        district_court: details.court,
        exchange: details.exchange,
        ticker: details.ticker,
    }
}

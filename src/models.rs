//! Data models for listing pages, filings records, and SEC index rows.
//!
//! This module defines the structures that flow between the scrapers, the
//! walker, and the writers:
//! - [`Record`]: one opaque filings entry as returned by the listing endpoint
//! - [`PageResult`] / [`Pagination`]: one page of the listing endpoint
//! - [`CaseDetails`]: fields scraped from a case page
//! - [`FilingRow`]: one row of the tabular filings export
//! - [`CompanyTicker`] / [`TenKEntry`]: SEC directory and 10-K index rows
//!
//! Records stay untyped (`serde_json::Map`) on purpose: the upstream schema
//! drifts and only `cld_id` is load-bearing.

use crate::error::{Result, ScrapeError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field used to deduplicate filings across pages.
pub const RECORD_ID_FIELD: &str = "cld_id";

/// One filings entry, key order preserved.
pub type Record = Map<String, Value>;

/// Returns the dedup key of a record, or `None` when it has no usable id.
///
/// The key is the JSON rendering of the value, so `1` and `"1"` stay distinct.
pub fn record_id(record: &Record) -> Option<String> {
    match record.get(RECORD_ID_FIELD) {
        None | Some(Value::Null) => None,
        Some(v) => Some(v.to_string()),
    }
}

/// Pagination metadata as sent by the server.
///
/// Values are kept raw; servers have been seen sending numbers, numeric
/// strings, and nothing at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pagination {
    pub current: Option<Value>,
    pub last: Option<Value>,
}

impl Pagination {
    /// The page the server claims it returned, if it can be read as an integer.
    pub fn current_index(&self) -> Option<i64> {
        self.current.as_ref().and_then(coerce_page_index)
    }

    /// The highest page the server claims to have, if it can be read as an integer.
    pub fn last_index(&self) -> Option<i64> {
        self.last.as_ref().and_then(coerce_page_index)
    }
}

/// Best-effort integer coercion for pagination values.
///
/// Integers pass through, floats truncate toward zero, strings are trimmed and
/// parsed as base-10. Anything else (bool, null, objects, `"3.5"`) is `None`.
pub fn coerce_page_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                    .map(|f| f.trunc() as i64)
            }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// One response from a page-based listing endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    /// The `foundset`: records on this page.
    pub records: Vec<Record>,
    pub pagination: Pagination,
}

impl PageResult {
    /// Interpret a decoded JSON body as a listing page.
    ///
    /// A missing or `null` `foundset` is an empty page and missing pagination
    /// is default pagination. A body that is not an object, a `foundset` that
    /// is not an array, or an entry that is not an object is malformed.
    pub fn from_value(url: &str, value: Value) -> Result<Self> {
        let Value::Object(mut body) = value else {
            return Err(ScrapeError::malformed(
                url,
                format!("expected a JSON object, got {}", json_kind(&value)),
            ));
        };

        let records = match body.remove("foundset") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(record) => Ok(record),
                    other => Err(ScrapeError::malformed(
                        url,
                        format!("foundset[{i}] is {}, expected an object", json_kind(&other)),
                    )),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(ScrapeError::malformed(
                    url,
                    format!("foundset is {}, expected an array", json_kind(&other)),
                ));
            }
        };

        let pagination = match body.remove("pagination") {
            Some(Value::Object(mut p)) => Pagination {
                current: p.remove("current"),
                last: p.remove("last"),
            },
            _ => Pagination::default(),
        };

        Ok(Self {
            records,
            pagination,
        })
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Outcome of the login handshake.
#[derive(Debug, Clone, Default)]
pub struct LoginResult {
    pub success: bool,
    pub errors: Option<Value>,
    pub redirect: Option<String>,
}

/// Fields scraped from a case page. Always present, empty when not found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaseDetails {
    pub court: String,
    pub exchange: String,
    pub ticker: String,
}

/// One row of the tabular filings export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilingRow {
    pub filing_name: String,
    pub filing_date: String,
    pub district_court: String,
    pub exchange: String,
    pub ticker: String,
}

impl FilingRow {
    pub const HEADER: [&'static str; 5] = [
        "Filing Name",
        "Filing Date",
        "District Court",
        "Exchange",
        "Ticker",
    ];
}

/// One company from the SEC ticker directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyTicker {
    pub ticker: String,
    /// Zero-padded to 10 digits.
    pub cik: String,
    pub name: String,
}

impl CompanyTicker {
    pub const HEADER: [&'static str; 3] = ["ticker", "cik", "name"];
}

/// One 10-K (or 10-K/A) filing from the submissions API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenKEntry {
    pub cik: String,
    pub accession: String,
    #[serde(default)]
    pub filing_date: String,
    #[serde(default)]
    pub primary_doc: String,
    #[serde(default)]
    pub tenk_url: String,
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub company: String,
}

impl TenKEntry {
    pub const HEADER: [&'static str; 7] = [
        "cik",
        "accession",
        "filing_date",
        "primary_doc",
        "tenk_url",
        "ticker",
        "company",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_page_index_variants() {
        assert_eq!(coerce_page_index(&json!(3)), Some(3));
        assert_eq!(coerce_page_index(&json!("7")), Some(7));
        assert_eq!(coerce_page_index(&json!(" 12 ")), Some(12));
        assert_eq!(coerce_page_index(&json!(2.9)), Some(2));
        assert_eq!(coerce_page_index(&json!("3.5")), None);
        assert_eq!(coerce_page_index(&json!("abc")), None);
        assert_eq!(coerce_page_index(&json!(null)), None);
        assert_eq!(coerce_page_index(&json!(true)), None);
        assert_eq!(coerce_page_index(&json!({"n": 1})), None);
    }

    #[test]
    fn test_page_result_from_full_body() {
        let body = json!({
            "foundset": [{"cld_id": 1}, {"cld_id": 2}],
            "pagination": {"current": "1", "last": 4}
        });
        let page = PageResult::from_value("u", body).unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.pagination.current_index(), Some(1));
        assert_eq!(page.pagination.last_index(), Some(4));
    }

    #[test]
    fn test_page_result_missing_keys_is_empty_page() {
        let page = PageResult::from_value("u", json!({})).unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.pagination, Pagination::default());

        let page = PageResult::from_value("u", json!({"foundset": null, "pagination": "x"})).unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.pagination.current_index(), None);
    }

    #[test]
    fn test_page_result_rejects_non_object_body() {
        let err = PageResult::from_value("https://x/filings.json", json!([1, 2])).unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedResponse { .. }));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_page_result_rejects_bad_foundset() {
        let err = PageResult::from_value("u", json!({"foundset": "nope"})).unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedResponse { .. }));

        let err = PageResult::from_value("u", json!({"foundset": [{"cld_id": 1}, 5]})).unwrap_err();
        assert!(err.to_string().contains("foundset[1]"));
    }

    #[test]
    fn test_record_id() {
        let with_num: Record = serde_json::from_value(json!({"cld_id": 108640})).unwrap();
        let with_str: Record = serde_json::from_value(json!({"cld_id": "108640"})).unwrap();
        let with_null: Record = serde_json::from_value(json!({"cld_id": null})).unwrap();
        let without: Record = serde_json::from_value(json!({"name": "x"})).unwrap();

        assert_eq!(record_id(&with_num).as_deref(), Some("108640"));
        assert_ne!(record_id(&with_num), record_id(&with_str));
        assert_eq!(record_id(&with_null), None);
        assert_eq!(record_id(&without), None);
    }

    #[test]
    fn test_tenk_entry_deserializes_partial_row() {
        let mut reader = csv::Reader::from_reader(
            "cik,accession,tenk_url\n0000320193,0000320193-23-000106,https://x/y.htm\n".as_bytes(),
        );
        let rows: Vec<TenKEntry> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].accession, "0000320193-23-000106");
        assert_eq!(rows[0].ticker, "");
    }
}

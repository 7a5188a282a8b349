//! Output writers for harvested records.
//!
//! # Submodules
//!
//! - [`jsonl`]: one JSON object per line, flushed per record, so an
//!   interrupted run still leaves a valid prefix
//! - [`table`]: CSV with a fixed header row, plus the matching reader used by
//!   the SEC stages that consume each other's output
//!
//! # Output Structure
//!
//! ```text
//! data/
//! ├── filings.jsonl          # SCAC records, normalized
//! ├── filings.csv            # SCAC table: Filing Name, Filing Date, District Court, Exchange, Ticker
//! ├── tickers.csv            # SEC company directory
//! ├── tenk_index.csv         # SEC 10-K index
//! └── tenk_filings/          # downloaded 10-K documents
//! ```

pub mod jsonl;
pub mod table;

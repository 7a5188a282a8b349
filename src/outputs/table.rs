//! CSV output and input.
//!
//! The header row is written when the file is created, so a run that
//! produces no rows still leaves a well-formed table. Rows are flushed as
//! they are written.

use crate::error::{Result, ScrapeError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;
use tracing::{info, instrument};

pub struct TableWriter {
    inner: csv::Writer<File>,
    written: usize,
}

impl TableWriter {
    /// Create (or truncate) `path` and write `header`.
    #[instrument(level = "info", skip(header), fields(path = %path.display()))]
    pub fn create(path: &Path, header: &[&str]) -> Result<Self> {
        let mut inner = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;
        inner.write_record(header)?;
        inner.flush()?;
        info!(columns = header.len(), "Opened CSV output");
        Ok(Self { inner, written: 0 })
    }

    /// Append one row. Field order follows the struct's field order.
    pub fn write_row<T: Serialize>(&mut self, row: &T) -> Result<()> {
        self.inner.serialize(row)?;
        self.inner.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<usize> {
        self.inner.flush()?;
        Ok(self.written)
    }
}

/// Write `rows` to a fresh file at `path`; returns the row count.
pub fn write_table<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<usize> {
    let mut writer = TableWriter::create(path, header)?;
    for row in rows {
        writer.write_row(row)?;
    }
    writer.finish()
}

/// Read every row of a headed CSV file.
#[instrument(level = "info", fields(path = %path.display()))]
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(ScrapeError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("CSV file not found: {}", path.display()),
        )));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<Result<Vec<T>, csv::Error>>()?;
    info!(rows = rows.len(), "Read CSV");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompanyTicker, FilingRow};

    #[test]
    fn test_header_written_even_without_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filings.csv");
        let writer = TableWriter::create(&path, &FilingRow::HEADER).unwrap();
        assert_eq!(writer.finish().unwrap(), 0);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Filing Name,Filing Date,District Court,Exchange,Ticker\n"
        );
    }

    #[test]
    fn test_rows_are_quoted_and_flushed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filings.csv");
        let mut writer = TableWriter::create(&path, &FilingRow::HEADER).unwrap();
        writer
            .write_row(&FilingRow {
                filing_name: "Acme, Inc. \"Widgets\"".into(),
                filing_date: "2024-01-02".into(),
                district_court: "S.D.N.Y.".into(),
                exchange: "NYSE".into(),
                ticker: "ACME".into(),
            })
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().nth(1).unwrap(),
            "\"Acme, Inc. \"\"Widgets\"\"\",2024-01-02,S.D.N.Y.,NYSE,ACME"
        );
        assert_eq!(writer.finish().unwrap(), 1);
    }

    #[test]
    fn test_write_then_read_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickers.csv");
        let rows = vec![CompanyTicker {
            ticker: "BRK.B".into(),
            cik: "0001067983".into(),
            name: "BERKSHIRE HATHAWAY INC, DEL".into(),
        }];
        assert_eq!(write_table(&path, &CompanyTicker::HEADER, &rows).unwrap(), 1);
        let back: Vec<CompanyTicker> = read_table(&path).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_table::<CompanyTicker>(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, ScrapeError::Io(_)));
    }
}

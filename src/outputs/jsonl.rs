//! JSON Lines output.
//!
//! Each record is serialized on its own line, UTF-8, no enclosing array, and
//! the writer is flushed after every line.

use crate::error::Result;
use crate::models::Record;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{info, instrument};

pub struct JsonLinesWriter<W> {
    inner: W,
    written: usize,
}

impl JsonLinesWriter<BufWriter<File>> {
    /// Create (or truncate) `path`.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).await?;
        info!("Opened JSON Lines output");
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: AsyncWrite + Unpin> JsonLinesWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Append one record and flush.
    pub async fn write_record(&mut self, record: &Record) -> Result<()> {
        let mut line = serde_json::to_string(record).map_err(std::io::Error::from)?;
        line.push('\n');
        self.inner.write_all(line.as_bytes()).await?;
        self.inner.flush().await?;
        self.written += 1;
        Ok(())
    }

    /// Flush and shut the underlying writer down; returns the line count.
    pub async fn finish(mut self) -> Result<usize> {
        self.inner.flush().await?;
        self.inner.shutdown().await?;
        Ok(self.written)
    }
}

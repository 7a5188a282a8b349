//! Error taxonomy shared by the scrapers, the walker, and the writers.
//!
//! Callers branch on the variant rather than on message text: a
//! [`ScrapeError::Transport`] raised while enriching one record can be logged
//! and skipped, while the same variant raised by a page fetch aborts the run.

use std::io;

use thiserror::Error;

/// Every failure a harvest run can surface.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network or HTTP-layer failure (connect, timeout, non-2xx status).
    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The server answered, but not with the shape we expected.
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },
    /// Login handshake rejected or impossible.
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

impl ScrapeError {
    pub fn transport(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.into(),
            source,
        }
    }

    pub fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// True for network-level failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Whether a per-record enrichment step may degrade instead of aborting.
    ///
    /// Transport and shape problems on a secondary fetch only cost that
    /// record its extra fields. Local I/O, auth, and config failures do not
    /// get better by moving on to the next record.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::MalformedResponse { .. }
        )
    }
}

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;

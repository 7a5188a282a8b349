//! Paginated fetch walker.
//!
//! [`FilingsWalker`] pulls pages from a [`PageSource`] one at a time and hands
//! out records one at a time, never yielding the same `cld_id` twice within a
//! traversal. It stops on the first of:
//!
//! - a page index the server already returned (the server is repeating itself)
//! - an empty page
//! - the caller's page limit
//! - the server-declared last page
//! - the hard fetch cap, for servers whose pagination is too broken to trust
//!
//! Failures from the source abort the traversal and are returned as-is; the
//! walker never retries.

use crate::error::Result;
use crate::models::{PageResult, Record, record_id};
use crate::utils::pause;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Upper bound on page fetches per traversal when nothing else stops it.
pub const DEFAULT_MAX_FETCHES: usize = 10_000;

/// Anything that can return one page of a listing endpoint.
pub trait PageSource {
    /// Fetch the page with the given 1-based index.
    async fn fetch_page(&self, page: i64) -> Result<PageResult>;
}

/// Why a traversal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The server returned an empty foundset.
    Exhausted { page: i64 },
    /// The server reported a page index it had already returned.
    RepeatedPage { page: i64 },
    /// The caller's page limit was reached.
    MaxPages { limit: usize },
    /// `current >= last` as reported by the server.
    LastPage { page: i64, last: i64 },
    /// The hard fetch cap was reached.
    FetchCap { fetches: usize },
    /// The server reported a page index with no successor.
    PageOverflow { page: i64 },
    /// A fetch failed; the error was returned to the caller.
    Aborted,
}

#[derive(Debug, Clone)]
pub struct WalkerOptions {
    max_pages: Option<usize>,
    delay: Duration,
    max_fetches: usize,
}

impl Default for WalkerOptions {
    fn default() -> Self {
        Self {
            max_pages: None,
            delay: Duration::ZERO,
            max_fetches: DEFAULT_MAX_FETCHES,
        }
    }
}

impl WalkerOptions {
    /// Limit on distinct pages. `None` and `Some(0)` both mean unlimited.
    pub fn max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages.filter(|&n| n > 0);
        self
    }

    /// Politeness delay inserted before every fetch after the first.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_fetches(mut self, max_fetches: usize) -> Self {
        self.max_fetches = max_fetches.max(1);
        self
    }

    /// Degraded mode for sessions without credentials: only page 1 is served.
    pub fn first_page_only(self) -> Self {
        self.max_pages(Some(1))
    }
}

/// Lazy, single-use traversal over a [`PageSource`].
pub struct FilingsWalker<'a, S> {
    source: &'a S,
    options: WalkerOptions,
    next_page: i64,
    seen_pages: HashSet<i64>,
    seen_ids: HashSet<String>,
    pending: VecDeque<Record>,
    stop: Option<StopReason>,
    fetches: usize,
    emitted: usize,
    duplicates: usize,
}

impl<'a, S: PageSource> FilingsWalker<'a, S> {
    pub fn new(source: &'a S, options: WalkerOptions) -> Self {
        Self {
            source,
            options,
            next_page: 1,
            seen_pages: HashSet::new(),
            seen_ids: HashSet::new(),
            pending: VecDeque::new(),
            stop: None,
            fetches: 0,
            emitted: 0,
            duplicates: 0,
        }
    }

    /// Next unseen record, `Ok(None)` once the traversal has ended.
    ///
    /// After an `Err` the walker is finished and keeps returning `Ok(None)`.
    pub async fn next(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                self.emitted += 1;
                return Ok(Some(record));
            }
            if self.stop.is_some() {
                return Ok(None);
            }
            self.advance().await?;
        }
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    /// Distinct page indices processed so far.
    pub fn pages_seen(&self) -> usize {
        self.seen_pages.len()
    }

    pub fn records_emitted(&self) -> usize {
        self.emitted
    }

    /// Records dropped because their `cld_id` was already emitted.
    pub fn duplicates_skipped(&self) -> usize {
        self.duplicates
    }

    async fn advance(&mut self) -> Result<()> {
        if self.fetches >= self.options.max_fetches {
            warn!(
                fetches = self.fetches,
                "Fetch cap reached before pagination ended; stopping"
            );
            self.stop = Some(StopReason::FetchCap {
                fetches: self.fetches,
            });
            return Ok(());
        }
        if self.fetches > 0 {
            pause(self.options.delay).await;
        }

        let requested = self.next_page;
        info!(page = requested, "Fetching page");
        self.fetches += 1;
        let page = match self.source.fetch_page(requested).await {
            Ok(page) => page,
            Err(e) => {
                self.stop = Some(StopReason::Aborted);
                return Err(e);
            }
        };

        let reported = page.pagination.current_index();
        if reported.is_none() {
            debug!(page = requested, raw = ?page.pagination.current, "Unusable current page; assuming requested index");
        }
        let current = reported.unwrap_or(requested);

        if !self.seen_pages.insert(current) {
            warn!(page = current, "Stopping; server returned duplicate pagination value");
            self.stop = Some(StopReason::RepeatedPage { page: current });
            return Ok(());
        }

        if page.records.is_empty() {
            info!(page = current, "No records returned; stopping");
            self.stop = Some(StopReason::Exhausted { page: current });
            return Ok(());
        }

        let total = page.records.len();
        let mut skipped = 0usize;
        for record in page.records {
            let fresh = match record_id(&record) {
                Some(id) => self.seen_ids.insert(id),
                None => true,
            };
            if fresh {
                self.pending.push_back(record);
            } else {
                skipped += 1;
            }
        }
        self.duplicates += skipped;
        info!(page = current, records = total, duplicates = skipped, "Processing page");

        if let Some(limit) = self.options.max_pages {
            if self.seen_pages.len() >= limit {
                info!(limit, "Reached max pages limit");
                self.stop = Some(StopReason::MaxPages { limit });
                return Ok(());
            }
        }

        if let Some(last) = page.pagination.last_index() {
            if current >= last {
                info!(last, "Reached server-reported last page");
                self.stop = Some(StopReason::LastPage {
                    page: current,
                    last,
                });
                return Ok(());
            }
        }

        let base = reported.unwrap_or(requested);
        match base.checked_add(1) {
            Some(next) => self.next_page = next,
            None => {
                warn!(page = base, "Page index cannot advance; stopping");
                self.stop = Some(StopReason::PageOverflow { page: base });
            }
        }
        Ok(())
    }
}

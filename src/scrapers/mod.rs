//! HTTP clients for the two upstream sources.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Stanford SCAC | [`scac`] | JSON endpoints + HTML case pages | Login needed to page past page 1 |
//! | SEC EDGAR | [`edgar`] | JSON submissions API + archive downloads | Requires a contactable User-Agent |
//!
//! # Common Patterns
//!
//! Both clients:
//! - Build their `reqwest::Client` from an [`HttpConfig`](crate::config::HttpConfig)
//! - Map non-2xx responses and network failures to
//!   [`ScrapeError::Transport`](crate::error::ScrapeError::Transport)
//! - Map undecodable bodies to
//!   [`ScrapeError::MalformedResponse`](crate::error::ScrapeError::MalformedResponse)
//! - Leave retry and skip decisions to the commands that call them

pub mod edgar;
pub mod scac;

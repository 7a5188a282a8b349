//! Utility functions for logging, file names, and output paths.
//!
//! This module provides helper functions used throughout the application:
//! - String truncation for log fields
//! - File-name sanitization for downloaded documents
//! - Rendering JSON values as table cells
//! - File system validation for output locations
//! - The politeness pause between requests

use crate::error::Result;
use serde_json::Value;
use std::fs as stdfs;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, instrument};

/// Truncate a string for logging purposes.
///
/// Long strings are cut at a char boundary at or below `max` bytes, with an
/// ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Make a string safe to use as a file name.
///
/// Alphanumerics (any script), `-`, `_` and `.` are kept; every other
/// character becomes `_`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(safe_filename("BRK.B"), "BRK.B");
/// assert_eq!(safe_filename("10-K/A 2024"), "10-K_A_2024");
/// ```
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Render a JSON value as a flat table cell.
///
/// Strings are written as-is, `null` and missing values are empty, anything
/// else uses its JSON text.
pub fn value_to_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Parse a `key=value` command-line pair.
pub fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}

/// Sleep for the politeness delay, if any.
pub async fn pause(delay: Duration) {
    if !delay.is_zero() {
        debug!(?delay, "Politeness pause");
        tokio::time::sleep(delay).await;
    }
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).await?;
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

/// [`ensure_writable_dir`] for the directory an output file will land in.
pub async fn ensure_parent_dir(file: &Path) -> Result<()> {
    match file.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => ensure_writable_dir(parent).await,
        None => ensure_writable_dir(Path::new(".")).await,
    }
}

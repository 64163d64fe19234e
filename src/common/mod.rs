//! Common utilities shared by every command

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

use std::path::Path;

pub use error::{Error, Result};

/// Current UTC time formatted as RFC 3339 with second precision
/// (`2024-05-01T12:00:00Z`)
pub fn utc_now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Encode `value` as pretty JSON for writing to `path`
///
/// An encoding failure is reported against the file it was meant for.
pub fn to_json_pretty<T: serde::Serialize>(path: &Path, value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).map_err(|e| Error::persistence(path, e))
}

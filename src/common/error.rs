//! Error types for the QA runner
//!
//! Messages end up in the JSON summary line and in the run report, so they
//! should say which document or file was at fault and what was wrong with it.

use std::path::Path;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the QA runner
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    #[error("Invalid document '{path}': {message}")]
    ConfigParse { path: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // === Execution Errors ===
    #[error(
        "Service not healthy after {attempts} attempt(s) within {timeout_secs}s (last: {last})"
    )]
    HealthTimeout {
        timeout_secs: u64,
        attempts: u32,
        last: String,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    // === Persistence Errors ===
    #[error("Failed to persist '{path}': {reason}")]
    Persistence { path: String, reason: String },
}

impl Error {
    /// Create a file read error for a path
    pub fn file_read(path: &Path, error: impl ToString) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Create a parse error for a document path
    pub fn config_parse(path: &Path, message: impl ToString) -> Self {
        Self::ConfigParse {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Create a persistence error for a report or state path
    pub fn persistence(path: &Path, reason: impl ToString) -> Self {
        Self::Persistence {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error means the runner was given invalid input
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::FileRead { .. } | Error::ConfigParse { .. } | Error::Config(_)
        )
    }
}

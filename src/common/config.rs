//! Runner settings file handling
//!
//! Tool-level defaults that are not part of a module's service intent: how
//! long a single HTTP request may take and where reports and the last-good
//! state live. Command-line flags override these values.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::{Error, Result};

/// Main settings structure
#[derive(Debug, Deserialize, Default)]
pub struct Settings {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpSettings,

    /// Output locations
    #[serde(default)]
    pub paths: PathSettings,
}

/// HTTP client settings
#[derive(Debug, Deserialize)]
pub struct HttpSettings {
    /// Per-request timeout for health probes and test cases
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_request_timeout() -> u64 {
    5
}

fn default_user_agent() -> String {
    format!("qa-runner/{}", env!("CARGO_PKG_VERSION"))
}

/// Output locations
#[derive(Debug, Deserialize)]
pub struct PathSettings {
    /// Root directory for per-module run reports
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Last-good state file
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            state_file: default_state_file(),
        }
    }
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("qa/reports")
}

fn default_state_file() -> PathBuf {
    PathBuf::from("qa/state/last_good.json")
}

impl Settings {
    /// Load settings from an explicit file, or from the default settings
    /// file when none is given
    ///
    /// Returns default settings if no explicit path is given and the default
    /// file doesn't exist. An explicit path that cannot be read is an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        settings.validate()?;
        Ok(settings)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
        toml::from_str(&content).map_err(|e| Error::config_parse(path, e))
    }

    fn validate(&self) -> Result<()> {
        if self.http.request_timeout_secs == 0 {
            return Err(Error::Config(
                "http.request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The per-request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.request_timeout_secs)
    }
}

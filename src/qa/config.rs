//! Service intent and test matrix documents
//!
//! Defines the data structures for deserializing the two YAML inputs of a
//! run and the validation that turns them into a [`QaConfig`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::common::{Error, Result};

/// Where a module's service lives and how to judge its health
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ServiceIntent {
    /// Name of the service
    pub service: String,
    /// Module identity, the key used for reports and last-good state
    pub module: String,
    /// Network location and health probe parameters
    pub target: Target,
    /// Informational latency and error-rate hints
    #[serde(default)]
    pub sla: Option<SlaHints>,
    /// Image identity used to compose the promoted tag
    pub deployment: Deployment,
}

/// Network location of the service under test
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Target {
    /// Base URL every path is appended to
    pub base_url: String,
    /// Path polled by the health gate
    pub health_endpoint: String,
    /// Metrics path, scraped by a sidecar rather than by the runner
    #[serde(default)]
    pub metrics_endpoint: Option<String>,
    /// Overall health gate budget in seconds
    pub health_timeout_seconds: i64,
    /// Seconds between health probe attempts
    pub health_check_interval_seconds: i64,
}

/// SLA hints. Recorded in the report, never enforced as a gate.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SlaHints {
    pub max_latency_ms: Option<f64>,
    pub max_error_rate: Option<f64>,
}

/// Deployment identity
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Deployment {
    /// Image repository; the promoted tag is `base_image:tag`
    pub base_image: String,
    /// Image the orchestrator built for this run, if it reports one
    #[serde(default)]
    pub candidate_image: Option<String>,
}

/// The ordered list of HTTP checks for a module
#[derive(Deserialize, Debug)]
pub struct TestMatrix {
    pub tests: Vec<TestCase>,
}

/// A single HTTP check
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct TestCase {
    /// Name, unique within the matrix
    pub name: String,
    /// HTTP method (default: GET)
    #[serde(default)]
    pub method: HttpMethod,
    /// Path appended to the base URL
    pub path: String,
    /// Expected response status (default: 200)
    #[serde(default = "default_expect_status")]
    pub expect_status: u16,
    /// Upper bound on observed latency, if any
    #[serde(default)]
    pub max_latency_ms: Option<u64>,
}

fn default_expect_status() -> u16 {
    200
}

/// HTTP methods a test case may use
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(try_from = "String", rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(format!("unknown HTTP method '{}'", s)),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Health gate parameters derived from a validated intent
#[derive(Debug, Clone)]
pub struct HealthProbe {
    pub url: String,
    pub timeout: Duration,
    pub interval: Duration,
}

/// A validated service intent together with its ordered test cases
#[derive(Debug, Clone)]
pub struct QaConfig {
    pub intent: ServiceIntent,
    pub cases: Vec<TestCase>,
}

impl QaConfig {
    /// Load and validate both input documents
    pub fn load(intent_path: &Path, matrix_path: &Path) -> Result<Self> {
        let intent: ServiceIntent = read_yaml(intent_path)?;
        intent
            .validate()
            .map_err(|message| Error::config_parse(intent_path, message))?;

        let matrix: TestMatrix = read_yaml(matrix_path)?;
        validate_cases(&matrix.tests).map_err(|message| Error::config_parse(matrix_path, message))?;

        if matrix.tests.is_empty() {
            tracing::warn!(
                "Test matrix '{}' declares no tests; only the health gate will be checked",
                matrix_path.display()
            );
        }

        Ok(Self {
            intent,
            cases: matrix.tests,
        })
    }

    /// Module identity of this run
    pub fn module(&self) -> &str {
        &self.intent.module
    }

    /// Full URL for a path on the service under test
    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.intent.target.base_url, path)
    }

    /// Health gate parameters
    pub fn health_probe(&self) -> HealthProbe {
        let target = &self.intent.target;
        HealthProbe {
            url: self.url_for(&target.health_endpoint),
            timeout: Duration::from_secs(target.health_timeout_seconds.unsigned_abs()),
            interval: Duration::from_secs(target.health_check_interval_seconds.unsigned_abs()),
        }
    }
}

impl ServiceIntent {
    /// Check ranges and required values that serde cannot express
    pub fn validate(&self) -> std::result::Result<(), String> {
        require_non_empty("service", &self.service)?;
        require_non_empty("module", &self.module)?;
        require_non_empty("deployment.base_image", &self.deployment.base_image)?;

        if self
            .module
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace())
            || self.module == "."
            || self.module == ".."
        {
            return Err(format!(
                "module '{}' must not contain path separators or whitespace",
                self.module
            ));
        }

        let target = &self.target;
        let url = reqwest::Url::parse(&target.base_url).map_err(|e| {
            format!("target.base_url '{}' is not a valid URL: {}", target.base_url, e)
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(format!(
                "target.base_url must use http or https, got '{}'",
                url.scheme()
            ));
        }

        require_path("target.health_endpoint", &target.health_endpoint)?;
        if let Some(metrics) = &target.metrics_endpoint {
            require_path("target.metrics_endpoint", metrics)?;
        }

        if target.health_timeout_seconds <= 0 {
            return Err(format!(
                "target.health_timeout_seconds must be a positive integer, got {}",
                target.health_timeout_seconds
            ));
        }
        if target.health_check_interval_seconds <= 0 {
            return Err(format!(
                "target.health_check_interval_seconds must be a positive integer, got {}",
                target.health_check_interval_seconds
            ));
        }
        if target.health_check_interval_seconds > target.health_timeout_seconds {
            return Err(format!(
                "target.health_check_interval_seconds ({}) must not exceed \
                 target.health_timeout_seconds ({})",
                target.health_check_interval_seconds,
                target.health_timeout_seconds
            ));
        }

        if let Some(sla) = &self.sla {
            if matches!(sla.max_latency_ms, Some(v) if v < 0.0) {
                return Err("sla.max_latency_ms must not be negative".to_string());
            }
            if matches!(sla.max_error_rate, Some(v) if !(0.0..=1.0).contains(&v)) {
                return Err("sla.max_error_rate must be between 0 and 1".to_string());
            }
        }

        Ok(())
    }
}

/// Check per-case values and name uniqueness across the matrix
pub fn validate_cases(cases: &[TestCase]) -> std::result::Result<(), String> {
    let mut seen = HashSet::new();

    for (i, case) in cases.iter().enumerate() {
        if case.name.trim().is_empty() {
            return Err(format!("tests[{}].name must not be empty", i));
        }
        if !seen.insert(case.name.as_str()) {
            return Err(format!("duplicate test name '{}'", case.name));
        }
        require_path(&format!("tests[{}].path", i), &case.path)?;
        if !(100..=599).contains(&case.expect_status) {
            return Err(format!(
                "test '{}': expect_status {} is not a valid HTTP status",
                case.name, case.expect_status
            ));
        }
        if case.max_latency_ms == Some(0) {
            return Err(format!(
                "test '{}': max_latency_ms must be greater than zero",
                case.name
            ));
        }
    }

    Ok(())
}

/// Append a path to a base URL without doubling the slash
pub fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
    serde_yaml::from_str(&content).map_err(|e| Error::config_parse(path, e))
}

fn require_non_empty(field: &str, value: &str) -> std::result::Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} must not be empty", field));
    }
    Ok(())
}

fn require_path(field: &str, value: &str) -> std::result::Result<(), String> {
    if !value.starts_with('/') {
        return Err(format!("{} must start with '/', got '{}'", field, value));
    }
    Ok(())
}

//! Run report writer
//!
//! Each invocation produces one JSON document at
//! `<reports_dir>/<module>/qa_run_<stamp>.json`. The document is written to a
//! temporary file in the same directory and then moved into place without
//! replacing anything, so an earlier report is never overwritten and a
//! half-written report is never visible under its final name.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tempfile::NamedTempFile;

use super::config::SlaHints;
use super::executor::TestResult;
use super::verdict::OverallStatus;
use crate::common::{to_json_pretty, Error, Result};

/// Highest numeric suffix tried when a report name is already taken
const MAX_DISAMBIGUATOR: u32 = 1000;

/// The immutable record of one run
#[derive(Serialize, Debug, Clone)]
pub struct RunReport {
    pub module: String,
    pub service: String,
    pub tag: String,
    /// Run timestamp used in the report file name
    pub run_stamp: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_ms: u64,
    pub base_url: String,
    /// Image tag this run would promote
    pub image_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_image: Option<String>,
    pub health_ok: bool,
    pub health_error: Option<String>,
    pub health_attempts: u32,
    pub health_elapsed_ms: u64,
    pub results: Vec<TestResult>,
    pub overall_status: OverallStatus,
    pub exit_code: i32,
    /// Set when the run passed but its last-good entry cannot be recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sla: Option<SlaHints>,
}

/// File-name stamp for a run, UTC with microsecond resolution
/// (`20240501T120000.123456Z`)
pub fn run_stamp(started: &DateTime<Utc>) -> String {
    started.format("%Y%m%dT%H%M%S%.6fZ").to_string()
}

fn report_file_name(stamp: &str, disambiguator: u32) -> String {
    if disambiguator == 0 {
        format!("qa_run_{}.json", stamp)
    } else {
        format!("qa_run_{}-{}.json", stamp, disambiguator)
    }
}

/// Write the report and return its final path
pub fn write_report(reports_dir: &Path, report: &RunReport) -> Result<PathBuf> {
    let module_dir = reports_dir.join(&report.module);
    std::fs::create_dir_all(&module_dir).map_err(|e| Error::persistence(&module_dir, e))?;

    let payload = to_json_pretty(&module_dir, report)?;

    let mut tmp =
        NamedTempFile::new_in(&module_dir).map_err(|e| Error::persistence(&module_dir, e))?;
    tmp.write_all(&payload)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::persistence(tmp.path(), e))?;

    for disambiguator in 0..=MAX_DISAMBIGUATOR {
        let path = module_dir.join(report_file_name(&report.run_stamp, disambiguator));
        match tmp.persist_noclobber(&path) {
            Ok(_) => {
                tracing::info!("Report written to {}", path.display());
                return Ok(path);
            }
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                tracing::debug!("Report name {} taken, trying next", path.display());
                tmp = e.file;
            }
            Err(e) => return Err(Error::persistence(&path, e.error)),
        }
    }

    Err(Error::persistence(
        &module_dir,
        format!(
            "no free report name for stamp {} after {} attempts",
            report.run_stamp, MAX_DISAMBIGUATOR
        ),
    ))
}

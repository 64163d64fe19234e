//! QA run orchestration
//!
//! Loads the configuration, gates on health, runs the matrix, aggregates,
//! and (unless dry-run) writes the report and updates the last-good state.
//! Health and test failures are captured as data; only configuration errors
//! stop a run early.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use super::config::QaConfig;
use super::executor::{self, TestResult};
use super::health::{self, HealthOutcome};
use super::http;
use super::report::{self, RunReport};
use super::state::{image_tag, JsonFileStore, LastGoodEntry, LastGoodStore};
use super::verdict::{self, ExitStatus, OverallStatus, Tally};
use crate::common::{Error, Result};

/// Inputs of a `run` invocation, after settings and flags are merged
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub serviceintent: PathBuf,
    pub test_matrix: PathBuf,
    /// Expected module identity; must match the intent when given
    pub module_name: Option<String>,
    /// Version tag assigned by the orchestrator; defaults to the run time
    pub tag: Option<String>,
    pub reports_dir: PathBuf,
    pub state_file: PathBuf,
    pub dry_run: bool,
    pub request_timeout: Duration,
    pub user_agent: String,
}

/// The single-line machine-readable summary of a run
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub module: Option<String>,
    pub tag: Option<String>,
    pub dry_run: bool,
    pub config_failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_error: Option<String>,
    pub health_ok: bool,
    pub health_error: Option<String>,
    pub tests: Tally,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
    pub exit_code: i32,
}

impl RunSummary {
    /// Summary for a run that never got past configuration
    pub fn config_failed(
        module: Option<String>,
        tag: Option<String>,
        dry_run: bool,
        error: &Error,
    ) -> Self {
        Self {
            module,
            tag,
            dry_run,
            config_failed: true,
            config_error: Some(error.to_string()),
            health_ok: false,
            health_error: None,
            tests: Tally::default(),
            report_path: None,
            persistence_error: None,
            exit_code: ExitStatus::InvalidInput.code(),
        }
    }
}

/// Everything a run produced
#[derive(Debug)]
pub struct RunOutcome {
    pub exit: ExitStatus,
    pub summary: RunSummary,
    /// The report, also when it was not written (dry-run); `None` when
    /// configuration failed
    pub report: Option<RunReport>,
}

/// Check a tag against the OCI tag grammar `[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}`
pub fn validate_tag(tag: &str) -> Result<()> {
    let mut chars = tag.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphanumeric() || first == '_')
                && tag.len() <= 128
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        }
        None => false,
    };

    if !valid {
        return Err(Error::Config(format!(
            "tag '{}' is not a valid image tag ([A-Za-z0-9_][A-Za-z0-9_.-]{{0,127}})",
            tag
        )));
    }
    Ok(())
}

fn load_config(opts: &RunOptions) -> Result<QaConfig> {
    let config = QaConfig::load(&opts.serviceintent, &opts.test_matrix)?;

    if let Some(expected) = &opts.module_name {
        if expected != config.module() {
            return Err(Error::Config(format!(
                "--module-name '{}' does not match module '{}' in {}",
                expected,
                config.module(),
                opts.serviceintent.display()
            )));
        }
    }
    if let Some(tag) = &opts.tag {
        validate_tag(tag)?;
    }

    Ok(config)
}

/// Execute one QA run
pub async fn run(opts: &RunOptions) -> RunOutcome {
    let started = Utc::now();
    let clock = Instant::now();

    let config = match load_config(opts) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            println!("{} {}", "✗ Configuration invalid:".red().bold(), e);
            return RunOutcome {
                exit: ExitStatus::InvalidInput,
                summary: RunSummary::config_failed(
                    opts.module_name.clone(),
                    opts.tag.clone(),
                    opts.dry_run,
                    &e,
                ),
                report: None,
            };
        }
    };

    let stamp = report::run_stamp(&started);
    let tag = opts
        .tag
        .clone()
        .unwrap_or_else(|| started.format("%Y%m%d-%H%M%S").to_string());
    let intent = &config.intent;

    println!(
        "\n{} {} {}",
        "QA run:".blue().bold(),
        intent.module.white().bold(),
        format!("({} @ {}, tag {})", intent.service, intent.target.base_url, tag).dimmed()
    );
    if opts.dry_run {
        println!("  {}", "dry run: no report or state will be written".yellow());
    }
    tracing::info!(
        "Starting QA for module={} base_url={} tests={}",
        intent.module,
        intent.target.base_url,
        config.cases.len()
    );

    println!("\n{}", "Health:".cyan());
    let (health, results) = match http::build_client(opts.request_timeout, &opts.user_agent) {
        Ok(client) => {
            let health =
                health::wait_until_healthy(&client, &config.health_probe(), opts.request_timeout)
                    .await;
            let results = if health.is_healthy() {
                println!("\n{}", "Tests:".cyan());
                executor::run_cases(&client, &intent.target.base_url, &config.cases).await
            } else {
                println!(
                    "  {} skipping {} test(s): service never became healthy",
                    "-".yellow(),
                    config.cases.len()
                );
                Vec::new()
            };
            (health, results)
        }
        Err(e) => {
            tracing::error!("{}", e);
            let health = HealthOutcome {
                attempts: 0,
                elapsed: Duration::ZERO,
                error: Some(e.to_string()),
            };
            (health, Vec::<TestResult>::new())
        }
    };

    let health_ok = health.is_healthy();
    let overall = verdict::overall_status(health_ok, &results);
    let mut exit = verdict::exit_status(true, health_ok, &results);

    let mut report = RunReport {
        module: intent.module.clone(),
        service: intent.service.clone(),
        tag: tag.clone(),
        run_stamp: stamp,
        started_at: started.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        finished_at: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        duration_ms: clock.elapsed().as_millis() as u64,
        base_url: intent.target.base_url.clone(),
        image_tag: image_tag(&intent.deployment.base_image, &tag),
        candidate_image: intent.deployment.candidate_image.clone(),
        health_ok,
        health_error: health.error.clone(),
        health_attempts: health.attempts,
        health_elapsed_ms: health.elapsed.as_millis() as u64,
        results,
        overall_status: overall,
        exit_code: exit.code(),
        persistence_error: None,
        sla: intent.sla.clone(),
    };

    let mut report_path = None;
    let mut persistence_error = None;
    if !opts.dry_run {
        if let Err(e) = persist(opts, &mut report, &mut report_path) {
            tracing::error!("{}", e);
            println!("  {} {}", "✗".red(), e);
            persistence_error = Some(e.to_string());
            exit = ExitStatus::Failure;
        }
    }

    let tests = Tally::from_results(&report.results);
    print_verdict(overall, exit, &tests);

    let summary = RunSummary {
        module: Some(intent.module.clone()),
        tag: Some(tag),
        dry_run: opts.dry_run,
        config_failed: false,
        config_error: None,
        health_ok,
        health_error: health.error,
        tests,
        report_path: report_path.map(|p| p.display().to_string()),
        persistence_error,
        exit_code: exit.code(),
    };

    RunOutcome {
        exit,
        summary,
        report: Some(report),
    }
}

/// Write the report, then record the last-good entry if the run passed
///
/// The state document is read before the report is written. If it is already
/// unusable the report itself records the failure and exit code 3, instead of
/// a pass that can never be recorded.
fn persist(
    opts: &RunOptions,
    report: &mut RunReport,
    report_path: &mut Option<PathBuf>,
) -> Result<()> {
    let store = JsonFileStore::new(&opts.state_file);
    let passed = report.overall_status == OverallStatus::Pass;

    let unusable_state = if passed { store.load().err() } else { None };
    if let Some(e) = &unusable_state {
        report.exit_code = ExitStatus::Failure.code();
        report.persistence_error = Some(e.to_string());
    }

    let path = report::write_report(&opts.reports_dir, report)?;
    println!("\n  Report written to {}", path.display());
    *report_path = Some(path);

    if let Some(e) = unusable_state {
        return Err(e);
    }

    if passed {
        store.record(&report.module, LastGoodEntry::now(report.image_tag.clone()))?;
        tracing::info!(
            "Last-good for {} is now {} ({})",
            report.module,
            report.image_tag,
            store.path().display()
        );
        println!(
            "  Last-good updated: {} -> {}",
            report.module, report.image_tag
        );
    }

    Ok(())
}

fn print_verdict(overall: OverallStatus, exit: ExitStatus, tests: &Tally) {
    let counts = format!(
        "{} passed, {} failed, {} io errors of {}",
        tests.pass, tests.fail, tests.io_error, tests.total
    );
    if exit == ExitStatus::Success {
        println!("\n{} {}\n", "✓ QA Passed".green().bold(), counts.dimmed());
    } else if overall == OverallStatus::Pass {
        println!(
            "\n{} {}\n",
            "✗ QA Passed but results could not be recorded".red().bold(),
            counts
        );
    } else {
        println!("\n{} {}\n", "✗ QA Failed".red().bold(), counts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tag() {
        assert!(validate_tag("42").is_ok());
        assert!(validate_tag("v1.2.3-rc_1").is_ok());
        assert!(validate_tag("_build").is_ok());
        assert!(validate_tag("").is_err());
        assert!(validate_tag("-leading-dash").is_err());
        assert!(validate_tag("has:colon").is_err());
        assert!(validate_tag(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_config_failed_summary() {
        let err = Error::Config("bad".into());
        let summary = RunSummary::config_failed(Some("api".into()), None, true, &err);
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["config_failed"], true);
        assert_eq!(json["exit_code"], 1);
        assert_eq!(json["health_ok"], false);
        assert!(json["health_error"].is_null());
        assert_eq!(json["tests"]["total"], 0);
        assert!(json.get("report_path").is_none());
    }
}

//! Result aggregation and exit code mapping
//!
//! The exit code is the orchestrator's only signal for whether to keep a
//! build, so the mapping is a pure function of the run's inputs:
//!
//! | code | meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | health gate passed and every check passed                |
//! | 1    | invalid input; nothing was executed                      |
//! | 2    | reserved for a future check category, never emitted      |
//! | 3    | health timeout, failed check, io error or write failure  |

use serde::Serialize;

use super::executor::{TestResult, TestStatus};

/// Verdict of a whole run
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Pass,
    Fail,
}

/// Process exit status reported to the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    InvalidInput,
    Failure,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::InvalidInput => 1,
            ExitStatus::Failure => 3,
        }
    }
}

/// `Pass` iff the health gate passed and every result passed
pub fn overall_status(health_ok: bool, results: &[TestResult]) -> OverallStatus {
    if health_ok && results.iter().all(TestResult::passed) {
        OverallStatus::Pass
    } else {
        OverallStatus::Fail
    }
}

/// Exit status for a run
pub fn exit_status(config_valid: bool, health_ok: bool, results: &[TestResult]) -> ExitStatus {
    if !config_valid {
        return ExitStatus::InvalidInput;
    }
    match overall_status(health_ok, results) {
        OverallStatus::Pass => ExitStatus::Success,
        OverallStatus::Fail => ExitStatus::Failure,
    }
}

/// Per-status counts of a run's results
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub total: usize,
    pub pass: usize,
    pub fail: usize,
    pub io_error: usize,
}

impl Tally {
    pub fn from_results(results: &[TestResult]) -> Self {
        results.iter().fold(Self::default(), |mut tally, result| {
            tally.total += 1;
            match result.status {
                TestStatus::Pass => tally.pass += 1,
                TestStatus::Fail => tally.fail += 1,
                TestStatus::IoError => tally.io_error += 1,
            }
            tally
        })
    }
}

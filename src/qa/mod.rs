//! QA runner
//!
//! Waits for a freshly started service to report healthy, runs the declared
//! HTTP checks against it in order, and records the outcome: one immutable
//! JSON report per run and, when everything passed, the module's last-good
//! image tag.

pub mod config;
pub mod executor;
pub mod health;
pub mod http;
pub mod report;
pub mod runner;
pub mod state;
pub mod verdict;

pub use config::{QaConfig, ServiceIntent, TestCase};
pub use executor::{TestResult, TestStatus};
pub use runner::{run, RunOptions, RunOutcome, RunSummary};
pub use verdict::{ExitStatus, OverallStatus};

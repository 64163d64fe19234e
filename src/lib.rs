//! QA runner - acceptance checks that gate promotion of a service build
//!
//! This library waits for a service to become healthy, runs a declared
//! matrix of HTTP checks against it, writes a per-run report and keeps a
//! last-good image tag per module.

pub mod cli;
pub mod commands;
pub mod common;
pub mod qa;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use qa::{ExitStatus, RunOptions, RunSummary};

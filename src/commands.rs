//! CLI command definitions
//!
//! Defines the clap commands for the QA runner.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Gate on health, run the test matrix and record the outcome
    Run {
        /// Service intent document (YAML)
        #[arg(long, alias = "service-intent")]
        serviceintent: PathBuf,

        /// Test matrix document (YAML)
        #[arg(long)]
        test_matrix: PathBuf,

        /// Expected module identity; must match the intent's `module`
        #[arg(long)]
        module_name: Option<String>,

        /// Version tag of the build under test (default: run timestamp)
        #[arg(long)]
        tag: Option<String>,

        /// Last-good state file (overrides settings)
        #[arg(long)]
        state_file: Option<PathBuf>,

        /// Root directory for run reports (overrides settings)
        #[arg(long)]
        reports_dir: Option<PathBuf>,

        /// Settings file (default: platform config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run every check but write no report and no state
        #[arg(long)]
        dry_run: bool,

        /// Print a single-line JSON summary on stdout
        #[arg(long)]
        log_json: bool,

        /// Verbose logging
        #[arg(long, short)]
        verbose: bool,
    },

    /// Load and validate the input documents without contacting the service
    Validate {
        /// Service intent document (YAML)
        #[arg(long, alias = "service-intent")]
        serviceintent: PathBuf,

        /// Test matrix document (YAML)
        #[arg(long)]
        test_matrix: PathBuf,

        /// Print the result as a single JSON line
        #[arg(long)]
        log_json: bool,
    },

    /// Show the last-good image tags
    LastGood {
        /// Last-good state file (overrides settings)
        #[arg(long)]
        state_file: Option<PathBuf>,

        /// Only show this module
        #[arg(long)]
        module: Option<String>,

        /// Settings file (default: platform config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Whether this command asked for machine-readable output
    pub fn wants_json(&self) -> bool {
        match self {
            Commands::Run { log_json, .. } | Commands::Validate { log_json, .. } => *log_json,
            Commands::LastGood { json, .. } => *json,
        }
    }

    pub fn verbose(&self) -> bool {
        matches!(self, Commands::Run { verbose: true, .. })
    }
}

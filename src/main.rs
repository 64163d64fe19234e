//! QA runner CLI
//!
//! Runs acceptance checks against a freshly built service instance and
//! reports, through its exit code, whether the build is safe to promote.

use clap::Parser;
use qa_runner::commands::Commands;
use qa_runner::common::logging;
use qa_runner::{cli, ExitStatus};

#[derive(Parser)]
#[command(name = "qa-runner", about = "Acceptance-check runner for freshly built services")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Usage errors are invalid input (1); clap would otherwise exit with 2,
    // which is reserved.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() {
                ExitStatus::InvalidInput.code()
            } else {
                ExitStatus::Success.code()
            };
            std::process::exit(code);
        }
    };

    logging::init_cli(cli.command.verbose());
    if cli.command.wants_json() {
        colored::control::set_override(false);
    }

    let status = cli::dispatch(cli.command).await;
    std::process::exit(status.code());
}

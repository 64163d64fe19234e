//! CLI command handling
//!
//! Merges settings with flags, dispatches to the QA runner and prints
//! results. Every command maps to an [`ExitStatus`]; nothing here panics or
//! bubbles a raw error up to `main`.

use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::Settings;
use crate::common::Error;
use crate::qa::state::{JsonFileStore, LastGoodStore};
use crate::qa::{self, ExitStatus, QaConfig, RunOptions, RunSummary};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> ExitStatus {
    match command {
        Commands::Run {
            serviceintent,
            test_matrix,
            module_name,
            tag,
            state_file,
            reports_dir,
            config,
            dry_run,
            log_json,
            verbose: _,
        } => {
            let settings = match Settings::load(config.as_deref()) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::error!("{}", e);
                    println!("{} {}", "✗ Settings invalid:".red().bold(), e);
                    if log_json {
                        print_json(&RunSummary::config_failed(module_name, tag, dry_run, &e));
                    }
                    return ExitStatus::InvalidInput;
                }
            };

            let opts = RunOptions {
                serviceintent,
                test_matrix,
                module_name,
                tag,
                reports_dir: reports_dir.unwrap_or_else(|| settings.paths.reports_dir.clone()),
                state_file: state_file.unwrap_or_else(|| settings.paths.state_file.clone()),
                dry_run,
                request_timeout: settings.request_timeout(),
                user_agent: settings.http.user_agent.clone(),
            };

            let outcome = qa::run(&opts).await;
            if log_json {
                print_json(&outcome.summary);
            }
            outcome.exit
        }

        Commands::Validate {
            serviceintent,
            test_matrix,
            log_json,
        } => validate(&serviceintent, &test_matrix, log_json),

        Commands::LastGood {
            state_file,
            module,
            config,
            json,
        } => {
            let state_file = match resolve_state_file(state_file, config.as_deref()) {
                Ok(path) => path,
                Err(e) => {
                    report_error(&e, json);
                    return ExitStatus::InvalidInput;
                }
            };
            last_good(&state_file, module.as_deref(), json)
        }
    }
}

fn validate(serviceintent: &Path, test_matrix: &Path, log_json: bool) -> ExitStatus {
    match QaConfig::load(serviceintent, test_matrix) {
        Ok(config) => {
            if log_json {
                print_json(&serde_json::json!({
                    "module": config.module(),
                    "config_failed": false,
                    "tests": config.cases.len(),
                    "exit_code": ExitStatus::Success.code(),
                }));
            } else {
                println!(
                    "{} module {} ({} test(s), health {} every {}s for up to {}s)",
                    "✓ Configuration valid:".green().bold(),
                    config.module(),
                    config.cases.len(),
                    config.intent.target.health_endpoint,
                    config.intent.target.health_check_interval_seconds,
                    config.intent.target.health_timeout_seconds
                );
            }
            ExitStatus::Success
        }
        Err(e) => {
            if log_json {
                print_json(&serde_json::json!({
                    "module": null,
                    "config_failed": true,
                    "config_error": e.to_string(),
                    "exit_code": ExitStatus::InvalidInput.code(),
                }));
            } else {
                println!("{} {}", "✗ Configuration invalid:".red().bold(), e);
            }
            ExitStatus::InvalidInput
        }
    }
}

fn resolve_state_file(explicit: Option<PathBuf>, config: Option<&Path>) -> Result<PathBuf, Error> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(Settings::load(config)?.paths.state_file),
    }
}

fn last_good(state_file: &Path, module: Option<&str>, json: bool) -> ExitStatus {
    let store = JsonFileStore::new(state_file);
    let state = match store.load() {
        Ok(state) => state,
        Err(e) => {
            report_error(&e, json);
            return ExitStatus::Failure;
        }
    };

    match module {
        Some(name) => match state.modules.get(name) {
            Some(entry) => {
                if json {
                    print_json(&serde_json::json!({ "module": name, "entry": entry }));
                } else {
                    println!("{:20} {}  ({})", name, entry.image_tag, entry.updated_at);
                }
                ExitStatus::Success
            }
            None => {
                if json {
                    print_json(&serde_json::json!({ "module": name, "entry": null }));
                } else {
                    println!("No last-good entry for module {}", name);
                }
                ExitStatus::InvalidInput
            }
        },
        None => {
            if json {
                print_json(&state);
            } else if state.modules.is_empty() {
                println!("No last-good entries in {}", state_file.display());
            } else {
                println!("Last-good images ({}):", state_file.display());
                for (name, entry) in &state.modules {
                    println!("  {:20} {}  ({})", name, entry.image_tag, entry.updated_at);
                }
            }
            ExitStatus::Success
        }
    }
}

fn report_error(e: &Error, json: bool) {
    tracing::error!("{}", e);
    if json {
        print_json(&serde_json::json!({ "status": "error", "message": e.to_string() }));
    } else {
        println!("{} {}", "✗".red(), e);
    }
}

/// Print a value as one line of JSON on stdout
fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => eprintln!("Error: failed to encode JSON output: {}", e),
    }
}

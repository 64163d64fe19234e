//! Health gate
//!
//! Polls the health endpoint every `interval`, starting immediately, until a
//! 200 is observed or the overall budget runs out. Non-200 responses,
//! connection failures and per-attempt timeouts all count as "not yet
//! healthy"; only the deadline ends the loop. No attempt is started at or
//! after the deadline.

use std::time::Duration;

use colored::Colorize;
use tokio::time::{sleep_until, Instant};

use super::config::HealthProbe;
use super::http::describe_error;
use crate::common::Error;

/// What a single probe attempt observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// The endpoint answered 200
    Healthy,
    /// The endpoint answered with another status
    Status(u16),
    /// The request could not be completed
    Unreachable(String),
}

impl Observation {
    fn describe(&self) -> String {
        match self {
            Observation::Healthy => "HTTP 200".to_string(),
            Observation::Status(code) => format!("HTTP {}", code),
            Observation::Unreachable(reason) => reason.clone(),
        }
    }
}

/// Result of the whole health gate
#[derive(Debug, Clone)]
pub struct HealthOutcome {
    /// Number of probe attempts made
    pub attempts: u32,
    /// Wall-clock time spent in the gate
    pub elapsed: Duration,
    /// Why the gate failed; `None` when the service became healthy
    pub error: Option<String>,
}

impl HealthOutcome {
    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}

/// Issue a single GET against the health URL
pub async fn probe_once(client: &reqwest::Client, url: &str, timeout: Duration) -> Observation {
    match client.get(url).timeout(timeout).send().await {
        Ok(resp) if resp.status() == reqwest::StatusCode::OK => Observation::Healthy,
        Ok(resp) => Observation::Status(resp.status().as_u16()),
        Err(e) => Observation::Unreachable(describe_error(&e)),
    }
}

/// Poll until healthy or until `probe.timeout` has elapsed
///
/// Each attempt is bounded by the smaller of `request_timeout` and the time
/// left in the budget.
pub async fn wait_until_healthy(
    client: &reqwest::Client,
    probe: &HealthProbe,
    request_timeout: Duration,
) -> HealthOutcome {
    let start = Instant::now();
    let deadline = start + probe.timeout;
    let mut attempts = 0u32;
    let mut last = Observation::Unreachable("no attempt made".to_string());

    tracing::info!(
        "Waiting for {} (timeout {:?}, interval {:?})",
        probe.url,
        probe.timeout,
        probe.interval
    );

    loop {
        let attempt_start = Instant::now();
        if attempt_start >= deadline {
            break;
        }

        attempts += 1;
        let budget = deadline.saturating_duration_since(attempt_start);
        let observation = probe_once(client, &probe.url, request_timeout.min(budget)).await;

        if observation == Observation::Healthy {
            let elapsed = start.elapsed();
            tracing::info!("Service healthy after {} attempt(s) in {:?}", attempts, elapsed);
            println!(
                "  {} healthy after {} attempt(s) ({:.1}s)",
                "✓".green(),
                attempts,
                elapsed.as_secs_f64()
            );
            return HealthOutcome {
                attempts,
                elapsed,
                error: None,
            };
        }

        tracing::debug!(
            "Health attempt {} not healthy: {}",
            attempts,
            observation.describe()
        );
        last = observation;

        let next_attempt = attempt_start + probe.interval;
        if next_attempt >= deadline {
            sleep_until(deadline).await;
            break;
        }
        sleep_until(next_attempt).await;
    }

    let elapsed = start.elapsed();
    let error = Error::HealthTimeout {
        timeout_secs: probe.timeout.as_secs(),
        attempts,
        last: last.describe(),
    };
    tracing::warn!("{}", error);
    println!("  {} {}", "✗".red(), error);

    HealthOutcome {
        attempts,
        elapsed,
        error: Some(error.to_string()),
    }
}

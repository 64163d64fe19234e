//! Test executor
//!
//! Runs the declared checks one at a time, in declaration order. A failing
//! case never stops the matrix: every case yields exactly one result.

use std::time::Instant;

use colored::Colorize;
use serde::Serialize;

use super::config::{join_url, HttpMethod, TestCase};
use super::http::describe_error;

/// Classification of a single check
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Pass,
    Fail,
    IoError,
}

/// Outcome of one test case
#[derive(Serialize, Debug, Clone)]
pub struct TestResult {
    pub name: String,
    pub method: HttpMethod,
    pub path: String,
    pub expect_status: u16,
    pub status: TestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TestResult {
    fn new(case: &TestCase, status: TestStatus) -> Self {
        Self {
            name: case.name.clone(),
            method: case.method,
            path: case.path.clone(),
            expect_status: case.expect_status,
            status,
            observed_status: None,
            latency_ms: None,
            error_message: None,
        }
    }

    /// Result for a request that could not be completed
    pub fn io_error(case: &TestCase, message: String) -> Self {
        Self {
            error_message: Some(message),
            ..Self::new(case, TestStatus::IoError)
        }
    }

    /// Result for a request that received a response
    pub fn observed(case: &TestCase, observed_status: u16, latency_ms: f64) -> Self {
        let mut problems = Vec::new();

        if observed_status != case.expect_status {
            problems.push(format!(
                "expected status {}, got {}",
                case.expect_status, observed_status
            ));
        }
        if let Some(max) = case.max_latency_ms {
            if latency_ms > max as f64 {
                problems.push(format!(
                    "latency {:.1}ms exceeded max {}ms",
                    latency_ms, max
                ));
            }
        }

        let status = if problems.is_empty() {
            TestStatus::Pass
        } else {
            TestStatus::Fail
        };

        Self {
            observed_status: Some(observed_status),
            latency_ms: Some(latency_ms),
            error_message: (!problems.is_empty()).then(|| problems.join("; ")),
            ..Self::new(case, status)
        }
    }

    pub fn passed(&self) -> bool {
        self.status == TestStatus::Pass
    }
}

/// Run a single case against the service
///
/// Latency covers sending the request and reading the whole response body.
pub async fn run_case(client: &reqwest::Client, base_url: &str, case: &TestCase) -> TestResult {
    let url = join_url(base_url, &case.path);
    let start = Instant::now();

    let response = match client.request(case.method.into(), &url).send().await {
        Ok(resp) => resp,
        Err(e) => return TestResult::io_error(case, describe_error(&e)),
    };

    let observed_status = response.status().as_u16();
    if let Err(e) = response.bytes().await {
        return TestResult::io_error(case, describe_error(&e));
    }
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

    TestResult::observed(case, observed_status, latency_ms)
}

/// Run every case in order and print a progress line for each
pub async fn run_cases(
    client: &reqwest::Client,
    base_url: &str,
    cases: &[TestCase],
) -> Vec<TestResult> {
    let mut results = Vec::with_capacity(cases.len());

    for (i, case) in cases.iter().enumerate() {
        let result = run_case(client, base_url, case).await;
        print_result(i + 1, &result);
        tracing::debug!(
            "Test '{}' {} {} -> {:?} {:?} {:?}",
            result.name,
            result.method,
            result.path,
            result.status,
            result.observed_status,
            result.latency_ms
        );
        results.push(result);
    }

    results
}

fn print_result(index: usize, result: &TestResult) {
    let label = format!("{} {} {}", result.name, result.method, result.path);
    match result.status {
        TestStatus::Pass => println!(
            "  {} Test {}: {} ({}, {:.1}ms)",
            "✓".green(),
            index,
            label.dimmed(),
            result.observed_status.unwrap_or_default(),
            result.latency_ms.unwrap_or_default()
        ),
        TestStatus::Fail => println!(
            "  {} Test {}: {} failed: {}",
            "✗".red(),
            index,
            label,
            result.error_message.as_deref().unwrap_or("")
        ),
        TestStatus::IoError => println!(
            "  {} Test {}: {} io error: {}",
            "✗".red(),
            index,
            label,
            result.error_message.as_deref().unwrap_or("")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qa::http::build_client;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn case(name: &str, path: &str, expect_status: u16, max_latency_ms: Option<u64>) -> TestCase {
        TestCase {
            name: name.to_string(),
            method: HttpMethod::Get,
            path: path.to_string(),
            expect_status,
            max_latency_ms,
        }
    }

    #[test]
    fn test_classify_pass() {
        let result = TestResult::observed(&case("root", "/", 200, Some(100)), 200, 12.5);
        assert_eq!(result.status, TestStatus::Pass);
        assert_eq!(result.observed_status, Some(200));
        assert!(result.error_message.is_none());
    }

    #[test]
    fn test_classify_status_mismatch() {
        let result = TestResult::observed(&case("root", "/", 200, None), 500, 3.0);
        assert_eq!(result.status, TestStatus::Fail);
        assert_eq!(
            result.error_message.as_deref(),
            Some("expected status 200, got 500")
        );
    }

    #[test]
    fn test_classify_latency_exceeded() {
        let result = TestResult::observed(&case("slow", "/", 200, Some(50)), 200, 75.0);
        assert_eq!(result.status, TestStatus::Fail);
        assert!(result.error_message.unwrap().contains("exceeded max 50ms"));
    }

    #[test]
    fn test_classify_both_problems() {
        let result = TestResult::observed(&case("bad", "/", 201, Some(10)), 200, 20.0);
        let message = result.error_message.unwrap();
        assert!(message.contains("expected status 201"));
        assert!(message.contains("; latency"));
    }

    #[test]
    fn test_io_error_has_no_observation() {
        let result =
            TestResult::io_error(&case("down", "/", 200, None), "connection failed".into());
        assert_eq!(result.status, TestStatus::IoError);
        assert!(result.observed_status.is_none());
        assert!(result.latency_ms.is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "io_error");
        assert!(json.get("observed_status").is_none());
        assert!(json.get("latency_ms").is_none());
    }

    #[tokio::test]
    async fn test_every_case_runs_in_order() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken");
                then.status(500);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/items");
                then.status(201).body("{}");
            })
            .await;

        let mut create = case("create", "/items", 201, None);
        create.method = HttpMethod::Post;
        let cases = vec![
            case("root", "/", 200, None),
            case("broken", "/broken", 200, None),
            create,
        ];

        let client = build_client(Duration::from_secs(2), "qa-runner-test").unwrap();
        let results = run_cases(&client, &server.base_url(), &cases).await;

        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["root", "broken", "create"]);
        assert_eq!(results[0].status, TestStatus::Pass);
        assert_eq!(results[1].status, TestStatus::Fail);
        assert_eq!(results[1].observed_status, Some(500));
        assert_eq!(results[2].status, TestStatus::Pass);
    }

    #[tokio::test]
    async fn test_request_timeout_is_io_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/hang");
                then.status(200).delay(Duration::from_secs(3));
            })
            .await;

        let client = build_client(Duration::from_millis(200), "qa-runner-test").unwrap();
        let result = run_case(&client, &server.base_url(), &case("hang", "/hang", 200, None)).await;

        assert_eq!(result.status, TestStatus::IoError);
        assert!(result.error_message.unwrap().starts_with("timeout"));
    }
}

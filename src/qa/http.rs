//! HTTP client construction and error description

use std::time::Duration;

use crate::common::Result;

/// Build the client shared by the health gate and the test executor
///
/// Every request is bounded by `request_timeout`. Redirects are not
/// followed so a check observes exactly the status the service returned.
pub fn build_client(request_timeout: Duration, user_agent: &str) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(request_timeout)
        .connect_timeout(request_timeout)
        .user_agent(user_agent)
        .redirect(reqwest::redirect::Policy::none())
        .build()?;
    Ok(client)
}

/// One-line description of a failed request, naming the failure class and
/// its root cause
pub fn describe_error(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_body() || err.is_decode() {
        "response body error"
    } else {
        "request failed"
    };

    let mut root: Option<&dyn std::error::Error> = None;
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        root = Some(cause);
        source = cause.source();
    }

    match root {
        Some(cause) => format!("{}: {}", kind, cause),
        None => format!("{}: {}", kind, err),
    }
}

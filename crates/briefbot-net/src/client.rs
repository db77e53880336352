//! Small JSON-over-HTTP client with exponential backoff + jitter, used by
//! every provider for both LLM-API and plain-JSON calls.

use std::time::Duration;

use rand::Rng;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, TransportError};

pub const DEFAULT_ATTEMPTS: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 26;
const USER_AGENT: &str = concat!("briefbot-net/", env!("CARGO_PKG_VERSION"));

const MIN_WAIT: f64 = 0.35;
const MAX_WAIT: f64 = 4.0;

fn retryable_status(status: StatusCode) -> bool {
    let code = status.as_u16();
    matches!(code, 408 | 425 | 429) || (500..=504).contains(&code) || code >= 520
}

fn backoff_delay(attempt_index: u32) -> Duration {
    let base = MIN_WAIT * 2f64.powi(attempt_index as i32);
    let capped = base.min(MAX_WAIT);
    let jitter: f64 = rand::thread_rng().gen_range(0.0..0.2);
    Duration::from_secs_f64(capped + jitter)
}

/// Wraps a non-object top-level JSON value as `{"data": value}`, matching the
/// contract every provider parser expects.
fn as_object(value: Value) -> Value {
    if value.is_object() {
        value
    } else {
        serde_json::json!({ "data": value })
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    debug: bool,
}

impl HttpClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "reqwest client builder failed, falling back to defaults");
                reqwest::Client::new()
            });
        Self {
            client,
            debug: false,
        }
    }

    /// A process-global debug flag: toggling mid-run is safe and only
    /// affects log verbosity (spec §5's shared-resource policy).
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub async fn request_json(
        &self,
        method: Method,
        url: &str,
        headers: Option<Vec<(&str, String)>>,
        json_body: Option<&Value>,
        timeout: Duration,
        retries: u32,
    ) -> Result<Value> {
        let mut last_error: Option<TransportError> = None;

        for attempt in 0..retries.max(1) {
            let mut req = self
                .client
                .request(method.clone(), url)
                .timeout(timeout)
                .header("Accept", "application/json");

            if let Some(body) = json_body {
                req = req.header("Content-Type", "application/json").json(body);
            }
            if let Some(headers) = &headers {
                for (name, value) in headers {
                    req = req.header(*name, value);
                }
            }

            if self.debug {
                debug!(attempt, %method, url, "briefbot-net request");
            }

            let response = match req.send().await {
                Ok(resp) => resp,
                Err(err) => {
                    let transport_retryable = err.is_timeout() || err.is_connect() || err.is_request();
                    last_error = Some(TransportError::new(err.to_string()).with_url(url.to_string()));
                    if transport_retryable && attempt + 1 < retries.max(1) {
                        warn!(attempt, url, error = %err, "retryable transport error");
                        tokio::time::sleep(backoff_delay(attempt)).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body_text = response.text().await.unwrap_or_default();
                let err = TransportError::new(format!("HTTP {status}"))
                    .with_status(status.as_u16())
                    .with_body(body_text.clone())
                    .with_url(url.to_string());
                if retryable_status(status) && attempt + 1 < retries.max(1) {
                    warn!(attempt, url, %status, "retryable HTTP status");
                    last_error = Some(err);
                    tokio::time::sleep(backoff_delay(attempt)).await;
                    continue;
                }
                return Err(err);
            }

            let value: Value = response
                .json()
                .await
                .map_err(|e| TransportError::new(e.to_string()).with_url(url.to_string()))?;
            return Ok(as_object(value));
        }

        Err(last_error.unwrap_or_else(|| TransportError::new("request failed with no attempts")))
    }

    pub async fn get_json(&self, url: &str, timeout: Duration) -> Result<Value> {
        self.request_json(Method::GET, url, None, None, timeout, DEFAULT_ATTEMPTS)
            .await
    }

    pub async fn post_json(&self, url: &str, body: &Value, timeout: Duration) -> Result<Value> {
        self.request_json(
            Method::POST,
            url,
            None,
            Some(body),
            timeout,
            DEFAULT_ATTEMPTS,
        )
        .await
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Given a Reddit thread path or full URL, constructs the public JSON
/// endpoint: ensures a leading `/`, strips a trailing `/`, appends `.json`
/// if absent, and attaches the query string the spec mandates.
pub fn reddit_json_url(path_or_url: &str) -> String {
    let path = path_or_url
        .split("reddit.com")
        .last()
        .unwrap_or(path_or_url);
    let mut path = path.to_string();
    if !path.starts_with('/') {
        path = format!("/{path}");
    }
    while path.ends_with('/') && path.len() > 1 {
        path.pop();
    }
    if !path.ends_with(".json") {
        path.push_str(".json");
    }
    format!("https://www.reddit.com{path}?raw_json=1&context=0&depth=1&limit=50&sort=top")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reddit_json_url_builds_expected_query() {
        let url = reddit_json_url("https://www.reddit.com/r/rust/comments/abc123/title/");
        assert_eq!(
            url,
            "https://www.reddit.com/r/rust/comments/abc123/title.json?raw_json=1&context=0&depth=1&limit=50&sort=top"
        );
    }

    #[test]
    fn reddit_json_url_handles_bare_path() {
        let url = reddit_json_url("/r/rust/comments/abc123/title");
        assert!(url.starts_with("https://www.reddit.com/r/rust/comments/abc123/title.json?"));
    }

    #[test]
    fn retryable_status_matches_spec_classes() {
        assert!(retryable_status(StatusCode::REQUEST_TIMEOUT));
        assert!(retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(retryable_status(StatusCode::BAD_GATEWAY));
        assert!(retryable_status(StatusCode::from_u16(520).unwrap()));
        assert!(!retryable_status(StatusCode::NOT_FOUND));
        assert!(!retryable_status(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn as_object_wraps_non_object_values() {
        assert_eq!(as_object(Value::from(5)), serde_json::json!({"data": 5}));
        assert_eq!(
            as_object(serde_json::json!({"a": 1})),
            serde_json::json!({"a": 1})
        );
    }
}

//! Model fallback chains shared by every LLM-backed provider, generalizing
//! the teacher's `ProviderRouter` slot-list failover (`skynet-agent/router.rs`)
//! from "next LLM provider" to "next candidate model id for this provider".

use std::future::Future;

use tracing::{info, warn};

use crate::error::{ProviderError, Result};

const ACCESS_ERROR_STATUSES: &[u16] = &[400, 401, 403, 404, 409, 422, 429];
const ACCESS_ERROR_PATTERNS: &[&str] = &[
    "organization must be verified",
    "does not have access",
    "model not found",
    "not available for your account",
    "access denied",
];

/// Classifies an HTTP failure as a recoverable "try the next model" access
/// error per spec §4.4, vs. a hard failure that should propagate.
pub fn is_access_error(status: u16, body: &str) -> bool {
    if !ACCESS_ERROR_STATUSES.contains(&status) {
        return false;
    }
    if status == 403 && body.trim().is_empty() {
        return true;
    }
    let lower = body.to_ascii_lowercase();
    ACCESS_ERROR_PATTERNS.iter().any(|pat| lower.contains(pat))
}

/// Runs `attempt` against each candidate model in order, falling through to
/// the next candidate on an access error and returning immediately on any
/// other error or on success. Returns `(value, model_used)`.
pub async fn with_model_fallback<F, Fut>(
    candidates: Vec<String>,
    provider_name: &str,
    mut attempt: F,
) -> Result<(serde_json::Value, String)>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<serde_json::Value>>,
{
    let mut last_err: Option<ProviderError> = None;

    for model in candidates {
        match attempt(model.clone()).await {
            Ok(value) => {
                if last_err.is_some() {
                    info!(provider = provider_name, model, "succeeded after model fallback");
                }
                return Ok((value, model));
            }
            Err(err) if err.is_access_error() => {
                warn!(provider = provider_name, model, error = %err, "access error, trying next model");
                last_err = Some(err);
                continue;
            }
            Err(other) => return Err(other),
        }
    }

    Err(last_err.unwrap_or_else(|| ProviderError::Unavailable("no candidate models available".to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_access_patterns_are_detected() {
        assert!(is_access_error(403, "Organization must be verified to use this model"));
        assert!(is_access_error(404, "model not found"));
        assert!(is_access_error(403, ""));
    }

    #[test]
    fn unrelated_error_bodies_are_not_access_errors() {
        assert!(!is_access_error(500, "internal server error"));
        assert!(!is_access_error(401, "totally unrelated message"));
    }

    #[tokio::test]
    async fn falls_through_access_errors_to_next_candidate() {
        let candidates = vec!["model-a".to_string(), "model-b".to_string()];
        let result = with_model_fallback(candidates, "test", |model| async move {
            if model == "model-a" {
                Err(ProviderError::Access {
                    status: 404,
                    message: "model not found".into(),
                })
            } else {
                Ok(serde_json::json!({"ok": true}))
            }
        })
        .await;
        let (_, model) = result.unwrap();
        assert_eq!(model, "model-b");
    }

    #[tokio::test]
    async fn hard_error_propagates_without_trying_next_model() {
        let candidates = vec!["model-a".to_string(), "model-b".to_string()];
        let calls = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let result = with_model_fallback(candidates, "test", move |_| {
            calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Err(ProviderError::Parse("malformed".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}

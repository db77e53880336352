//! X/Twitter discovery via xAI's `x_search` tool (spec §4.4). The fallback
//! chain is two-phase: the static [`briefbot_cache::XAI_MODEL_PREFERENCE`]
//! list first, then a live model-discovery pass once every static
//! candidate has been rejected as an access error — grounded on
//! `lib/xai_x.py`'s `search()`.

use std::collections::HashMap;

use briefbot_cache::{ModelRegistry, XAI_HARDCODED_FALLBACK, XAI_MODEL_PREFERENCE};
use briefbot_core::config::SamplingTier;
use briefbot_core::content::{Channel, Interaction, Scorecard, Signal, Span};
use briefbot_net::HttpClient;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{ProviderError, Result};
use crate::fallback::{is_access_error, with_model_fallback};
use crate::json_scan::{extract_model_text, first_object_with_array};
use crate::sampling::{search_timeout, target_range};

const API_URL: &str = "https://api.x.ai/v1/responses";

const PROMPT: &str = "Search X (Twitter) for posts about: {topic}\n\n\
Window: {start} to {end}. Target {min}-{max} meaningful posts.\n\n\
Return JSON only:\n\
{{\n  \"posts\": [\n    {{\n      \"excerpt\": \"Short post text\",\n      \"link\": \"https://x.com/user/status/1234567890\",\n      \"handle\": \"example_user\",\n      \"posted\": \"YYYY-MM-DD or null\",\n      \"metrics\": {{\"likes\": 250, \"reposts\": 40, \"replies\": 30, \"quotes\": 8}},\n      \"signal\": 0.9,\n      \"reason\": \"Why this post matters\"\n    }}\n  ]\n}}\n\n\
Favor original insight over retweets and link dumps.";

fn build_payload(model: &str, topic: &str, start: &str, end: &str, tier: SamplingTier) -> Value {
    let (min, max) = target_range(tier, Channel::X);
    let prompt = PROMPT
        .replace("{topic}", topic)
        .replace("{start}", start)
        .replace("{end}", end)
        .replace("{min}", &min.to_string())
        .replace("{max}", &max.to_string());
    json!({
        "model": model,
        "tools": [{"type": "x_search"}],
        "input": [{"role": "user", "content": prompt}],
    })
}

fn classify_transport_error(err: briefbot_net::TransportError) -> ProviderError {
    match err.status {
        Some(status) if is_access_error(status, err.body.as_deref().unwrap_or("")) => {
            ProviderError::Access {
                status,
                message: err.message,
            }
        }
        _ => ProviderError::Transport(err),
    }
}

async fn attempt(
    http: &HttpClient,
    api_key: &str,
    model: String,
    topic: &str,
    start: &str,
    end: &str,
    tier: SamplingTier,
    timeout: std::time::Duration,
) -> Result<Value> {
    let payload = build_payload(&model, topic, start, end, tier);
    http.request_json(
        reqwest::Method::POST,
        API_URL,
        Some(vec![("Authorization", format!("Bearer {api_key}"))]),
        Some(&payload),
        timeout,
        2,
    )
    .await
    .map_err(classify_transport_error)
}

/// Runs the two-phase fallback chain described in spec §4.4: static
/// preference list, then (if exhausted) a live `discover_xai_models` pass
/// for any untried `grok-*` candidate.
pub async fn search(
    http: &HttpClient,
    registry: &ModelRegistry,
    api_key: &str,
    model: &str,
    topic: &str,
    start: &str,
    end: &str,
    tier: SamplingTier,
    mock: Option<Value>,
) -> Result<Value> {
    if let Some(fixture) = mock {
        return Ok(fixture);
    }

    let timeout = search_timeout(tier, Channel::X);

    let mut static_candidates = vec![model.to_string()];
    for candidate in XAI_MODEL_PREFERENCE {
        if !static_candidates.iter().any(|c| c == candidate) {
            static_candidates.push(candidate.to_string());
        }
    }

    let static_result = with_model_fallback(static_candidates.clone(), "x", |candidate| {
        attempt(http, api_key, candidate, topic, start, end, tier, timeout)
    })
    .await;

    match static_result {
        Ok((value, used_model)) => {
            if used_model != model {
                registry.set_cached_model("xai", &used_model);
            }
            return Ok(value);
        }
        Err(err) if !err.is_access_error() => return Err(err),
        Err(last_static_err) => {
            warn!("x provider: static model chain exhausted, discovering live models");
            let discovered = registry.discover_xai_models(api_key).await;
            let dynamic: Vec<String> = discovered
                .into_iter()
                .filter(|m| m.starts_with("grok-") && !static_candidates.iter().any(|c| c == m))
                .collect();

            if dynamic.is_empty() {
                return Err(last_static_err);
            }

            match with_model_fallback(dynamic, "x", |candidate| {
                attempt(http, api_key, candidate, topic, start, end, tier, timeout)
            })
            .await
            {
                Ok((value, used_model)) => {
                    info!(model = %used_model, "x provider: dynamic discovery fallback succeeded");
                    registry.set_cached_model("xai", &used_model);
                    Ok(value)
                }
                Err(_) => {
                    registry.set_cached_model("xai", XAI_HARDCODED_FALLBACK);
                    Err(last_static_err)
                }
            }
        }
    }
}

/// One normalized X post, before conversion into a [`Signal`].
#[derive(Debug, Clone)]
pub struct RawPost {
    pub key: String,
    pub excerpt: String,
    pub url: String,
    pub handle: String,
    pub dated: Option<String>,
    pub likes: Option<i64>,
    pub reposts: Option<i64>,
    pub replies: Option<i64>,
    pub quotes: Option<i64>,
    pub topicality: f64,
    pub rationale: String,
}

fn is_iso_date(s: &str) -> bool {
    s.len() == 10 && s.as_bytes()[4] == b'-' && s.as_bytes()[7] == b'-'
}

fn coerce_int(value: Option<&Value>) -> Option<i64> {
    value.and_then(|v| {
        if v.is_null() {
            None
        } else {
            v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
        }
    })
}

pub fn parse_x(raw_response: &Value) -> Vec<RawPost> {
    if let Some(err) = raw_response.get("error") {
        warn!(error = %err, "x provider: api returned an error payload");
        return Vec::new();
    }

    let text = extract_model_text(raw_response);
    if text.is_empty() {
        return Vec::new();
    }
    let Some(obj) = first_object_with_array(&text, "posts") else {
        return Vec::new();
    };
    let Some(posts) = obj.get("posts").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for raw in posts {
        let Some(link) = raw.get("link").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) else {
            continue;
        };
        let handle = raw
            .get("handle")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .trim_start_matches('@')
            .to_string();
        let dated = raw
            .get("posted")
            .and_then(|v| v.as_str())
            .filter(|d| is_iso_date(d))
            .map(str::to_string);
        let metrics = raw.get("metrics");
        let topicality = raw
            .get("signal")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.55)
            .clamp(0.0, 1.0);

        out.push(RawPost {
            key: format!("X{}", out.len() + 1),
            excerpt: raw
                .get("excerpt")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim()
                .to_string(),
            url: link.to_string(),
            handle,
            dated,
            likes: coerce_int(metrics.and_then(|m| m.get("likes"))),
            reposts: coerce_int(metrics.and_then(|m| m.get("reposts"))),
            replies: coerce_int(metrics.and_then(|m| m.get("replies"))),
            quotes: coerce_int(metrics.and_then(|m| m.get("quotes"))),
            topicality,
            rationale: raw
                .get("reason")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim()
                .to_string(),
        });
    }
    out
}

pub fn to_signal(raw: RawPost, span: &Span) -> Signal {
    let time_confidence = briefbot_core::timeframe::date_confidence(raw.dated.as_deref(), span);
    let mut extras = HashMap::new();
    extras.insert("handle".to_string(), raw.handle.clone());
    Signal {
        key: raw.key,
        channel: Channel::X,
        headline: raw.excerpt.chars().take(80).collect(),
        url: raw.url,
        byline: Some(format!("@{}", raw.handle)),
        blurb: Some(raw.excerpt),
        dated: raw.dated,
        time_confidence,
        interaction: Interaction {
            likes: raw.likes,
            reposts: raw.reposts,
            replies: raw.replies,
            quotes: raw.quotes,
            ..Default::default()
        },
        topicality: raw.topicality,
        rationale: Some(raw.rationale),
        rank: 0,
        scorecard: Scorecard::default(),
        thread_notes: Vec::new(),
        notables: Vec::new(),
        extras,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_posts_and_strips_at_from_handle() {
        let raw = json!({
            "output": "{\"posts\": [{\"excerpt\": \"hot take\", \"link\": \"https://x.com/u/status/1\", \"handle\": \"@someone\", \"posted\": \"2026-01-20\", \"metrics\": {\"likes\": 10, \"reposts\": null}, \"signal\": 0.8}]}"
        });
        let posts = parse_x(&raw);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].handle, "someone");
        assert_eq!(posts[0].likes, Some(10));
        assert_eq!(posts[0].reposts, None);
        assert_eq!(posts[0].key, "X1");
    }

    #[test]
    fn empty_link_is_dropped() {
        let raw = json!({"output": "{\"posts\": [{\"excerpt\": \"x\", \"link\": \"\"}]}"});
        assert!(parse_x(&raw).is_empty());
    }

    #[test]
    fn scenario_b_metrics_coerce_to_ints() {
        let raw = json!({
            "output": "{\"posts\": [{\"excerpt\": \"x\", \"link\": \"https://x.com/u/1\", \"metrics\": {\"likes\": 2100, \"reposts\": 380, \"replies\": 95, \"quotes\": 42}}]}"
        });
        let posts = parse_x(&raw);
        assert_eq!(posts[0].likes, Some(2100));
        assert_eq!(posts[0].reposts, Some(380));
        assert_eq!(posts[0].replies, Some(95));
        assert_eq!(posts[0].quotes, Some(42));
    }
}

//! Reddit discovery via an LLM web-search tool (spec §4.4). Grounded on
//! `providers/reddit.py`'s prompt shape and normalization rules, wired
//! through the model-fallback router shared by every LLM-backed provider.

use briefbot_cache::ModelRegistry;
use briefbot_core::config::SamplingTier;
use briefbot_core::content::{Channel, Interaction, Scorecard, Signal, Span};
use briefbot_net::HttpClient;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{ProviderError, Result};
use crate::fallback::with_model_fallback;
use crate::json_scan::{extract_model_text, first_object_with_array};
use crate::sampling::{search_timeout, target_range};

const API_URL: &str = "https://api.openai.com/v1/responses";
const FALLBACK_MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini"];

const PROMPT: &str = "You are scouting Reddit threads for research.\n\n\
Topic: {topic}\n\
Window: {start} through {end}\n\
Goal: collect {min}-{max} substantive threads.\n\n\
Guidelines:\n\
- First compress the topic into a 2-4 word search phrase.\n\
- Search broadly across reddit.com for relevant discussions.\n\
- Prefer community discussions with details or lessons learned.\n\n\
Return JSON only in this structure:\n\
{{\n  \"threads\": [\n    {{\n      \"headline\": \"Thread title\",\n      \"url\": \"https://www.reddit.com/r/example/comments/abc123/example_thread/\",\n      \"forum\": \"example\",\n      \"dated\": \"YYYY-MM-DD or null\",\n      \"topicality\": 0.9,\n      \"rationale\": \"Why this thread matters\"\n    }}\n  ]\n}}";

fn build_payload(model: &str, topic: &str, start: &str, end: &str, tier: SamplingTier) -> Value {
    let (min, max) = target_range(tier, Channel::Reddit);
    let prompt = PROMPT
        .replace("{topic}", topic)
        .replace("{start}", start)
        .replace("{end}", end)
        .replace("{min}", &min.to_string())
        .replace("{max}", &max.to_string());
    json!({
        "model": model,
        "input": [{"role": "user", "content": prompt}],
        "tools": [{"type": "web_search", "filters": {"allowed_domains": ["reddit.com"]}}],
        "temperature": 0.2,
        "max_output_tokens": 1200,
    })
}

/// Runs the discovery call with the provider's model-fallback chain,
/// persisting the working model via the registry on success. `mock`
/// bypasses the network entirely (fixture mode).
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

    let mut candidates = vec![model.to_string()];
    for fallback in FALLBACK_MODELS {
        if !candidates.iter().any(|c| c == fallback) {
            candidates.push(fallback.to_string());
        }
    }

    let timeout = search_timeout(tier, Channel::Reddit);
    let (value, used_model) = with_model_fallback(candidates, "reddit", |candidate| {
        let payload = build_payload(&candidate, topic, start, end, tier);
        async move {
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
    })
    .await?;

    if used_model != model {
        registry.set_cached_model("openai", &used_model);
    }
    Ok(value)
}

fn classify_transport_error(err: briefbot_net::TransportError) -> ProviderError {
    match err.status {
        Some(status) if crate::fallback::is_access_error(status, err.body.as_deref().unwrap_or("")) => {
            ProviderError::Access {
                status,
                message: err.message,
            }
        }
        _ => ProviderError::Transport(err),
    }
}

/// One normalized Reddit thread, before conversion into a [`Signal`].
#[derive(Debug, Clone)]
pub struct RawThread {
    pub key: String,
    pub headline: String,
    pub url: String,
    pub forum: String,
    pub dated: Option<String>,
    pub topicality: f64,
    pub rationale: String,
}

/// Scans the model's free-form text for the first `{"threads": [...]}`
/// object and normalizes each entry. Invalid JSON or a missing shape
/// yields an empty (not erroring) result per spec §4.4.
pub fn parse_reddit(raw_response: &Value) -> Vec<RawThread> {
    if let Some(err) = raw_response.get("error") {
        warn!(error = %err, "reddit provider: api returned an error payload");
        return Vec::new();
    }

    let text = extract_model_text(raw_response);
    if text.is_empty() {
        return Vec::new();
    }

    let Some(obj) = first_object_with_array(&text, "threads") else {
        return Vec::new();
    };
    let Some(threads) = obj.get("threads").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for raw in threads {
        let Some(url) = raw.get("url").and_then(|v| v.as_str()) else {
            continue;
        };
        if !url.contains("reddit.com") {
            continue;
        }
        let mut forum = raw
            .get("forum")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        if let Some(rest) = forum.strip_prefix("r/") {
            forum = rest.to_string();
        }
        let dated = raw
            .get("dated")
            .and_then(|v| v.as_str())
            .filter(|d| is_iso_date(d))
            .map(str::to_string);
        let topicality = raw
            .get("topicality")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.5)
            .clamp(0.0, 1.0);

        out.push(RawThread {
            key: format!("RDT-{:02}", out.len() + 1),
            headline: raw
                .get("headline")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim()
                .to_string(),
            url: url.to_string(),
            forum,
            dated,
            topicality,
            rationale: raw
                .get("rationale")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim()
                .to_string(),
        });
    }
    out
}

fn is_iso_date(s: &str) -> bool {
    s.len() == 10
        && s.as_bytes()[4] == b'-'
        && s.as_bytes()[7] == b'-'
        && s.bytes().enumerate().all(|(i, b)| {
            if i == 4 || i == 7 {
                true
            } else {
                b.is_ascii_digit()
            }
        })
}

/// Converts a parsed thread into the unified [`Signal`] model.
/// `time_confidence` is computed against `span` per spec §3.
pub fn to_signal(raw: RawThread, span: &Span) -> Signal {
    let time_confidence = briefbot_core::timeframe::date_confidence(raw.dated.as_deref(), span);
    let mut extras = std::collections::HashMap::new();
    if !raw.forum.is_empty() {
        extras.insert("subreddit".to_string(), raw.forum.clone());
    }
    Signal {
        key: raw.key,
        channel: Channel::Reddit,
        headline: raw.headline,
        url: raw.url,
        byline: if raw.forum.is_empty() {
            None
        } else {
            Some(format!("r/{}", raw.forum))
        },
        blurb: None,
        dated: raw.dated,
        time_confidence,
        interaction: Interaction::default(),
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
    fn parses_threads_and_strips_leading_r_slash() {
        let raw = json!({
            "output": "noise {\"threads\": [{\"headline\": \"Rust 2.0\", \"url\": \"https://www.reddit.com/r/rust/comments/abc/x/\", \"forum\": \"r/rust\", \"dated\": \"2026-01-15\", \"topicality\": 0.9, \"rationale\": \"relevant\"}]} trailing"
        });
        let threads = parse_reddit(&raw);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].forum, "rust");
        assert_eq!(threads[0].key, "RDT-01");
    }

    #[test]
    fn rejects_non_reddit_urls() {
        let raw = json!({
            "output": "{\"threads\": [{\"headline\": \"x\", \"url\": \"https://example.com/post\", \"forum\": \"rust\"}]}"
        });
        assert!(parse_reddit(&raw).is_empty());
    }

    #[test]
    fn invalid_date_is_nulled() {
        let raw = json!({
            "output": "{\"threads\": [{\"headline\": \"x\", \"url\": \"https://reddit.com/r/rust/1\", \"dated\": \"not-a-date\"}]}"
        });
        let threads = parse_reddit(&raw);
        assert_eq!(threads[0].dated, None);
    }

    #[test]
    fn api_error_payload_yields_empty_result() {
        let raw = json!({"error": {"message": "boom"}});
        assert!(parse_reddit(&raw).is_empty());
    }
}

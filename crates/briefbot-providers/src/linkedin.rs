//! LinkedIn discovery via an LLM web-search tool (spec §4.4), grounded on
//! `providers/linkedin.py`.

use briefbot_cache::ModelRegistry;
use briefbot_core::config::SamplingTier;
use briefbot_core::content::{Channel, Interaction, Scorecard, Signal, Span};
use briefbot_net::HttpClient;
use serde_json::{json, Value};
use tracing::warn;

use crate::error::{ProviderError, Result};
use crate::fallback::{is_access_error, with_model_fallback};
use crate::json_scan::{extract_model_text, first_object_with_array};
use crate::sampling::{search_timeout, target_range};

const API_URL: &str = "https://api.openai.com/v1/responses";
const FALLBACK_MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini"];

const PROMPT: &str = "Find LinkedIn posts and articles about: {topic}\n\n\
Window: {start} through {end}. Target {min}-{max} posts.\n\n\
Only return individual post or article permalinks, not job listings.\n\n\
Return JSON only:\n\
{{\n  \"posts\": [\n    {{\n      \"headline\": \"Post summary\",\n      \"url\": \"https://www.linkedin.com/posts/...\",\n      \"author\": \"Author Name\",\n      \"dated\": \"YYYY-MM-DD or null\",\n      \"reactions\": 120,\n      \"comments\": 15,\n      \"topicality\": 0.85,\n      \"rationale\": \"Why this post matters\"\n    }}\n  ]\n}}";

fn build_payload(model: &str, topic: &str, start: &str, end: &str, tier: SamplingTier) -> Value {
    let (min, max) = target_range(tier, Channel::Linkedin);
    let prompt = PROMPT
        .replace("{topic}", topic)
        .replace("{start}", start)
        .replace("{end}", end)
        .replace("{min}", &min.to_string())
        .replace("{max}", &max.to_string());
    json!({
        "model": model,
        "input": [{"role": "user", "content": prompt}],
        "tools": [{"type": "web_search", "filters": {"allowed_domains": ["linkedin.com"]}}],
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

    let timeout = search_timeout(tier, Channel::Linkedin);
    let (value, used_model) = with_model_fallback(candidates, "linkedin", |candidate| {
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

#[derive(Debug, Clone)]
pub struct RawPost {
    pub key: String,
    pub headline: String,
    pub url: String,
    pub author: String,
    pub dated: Option<String>,
    pub reactions: Option<i64>,
    pub comments: Option<i64>,
    pub topicality: f64,
    pub rationale: String,
}

fn is_iso_date(s: &str) -> bool {
    s.len() == 10 && s.as_bytes()[4] == b'-' && s.as_bytes()[7] == b'-'
}

pub fn parse_linkedin(raw_response: &Value) -> Vec<RawPost> {
    if let Some(err) = raw_response.get("error") {
        warn!(error = %err, "linkedin provider: api returned an error payload");
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
        let Some(url) = raw.get("url").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) else {
            continue;
        };
        if !url.contains("linkedin.com") {
            continue;
        }
        if url.contains("/jobs/") || url.contains("/job/") {
            continue;
        }
        let dated = raw
            .get("dated")
            .and_then(|v| v.as_str())
            .filter(|d| is_iso_date(d))
            .map(str::to_string);

        out.push(RawPost {
            key: format!("LI-{:02}", out.len() + 1),
            headline: raw
                .get("headline")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim()
                .to_string(),
            url: url.to_string(),
            author: raw
                .get("author")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim()
                .to_string(),
            dated,
            reactions: raw.get("reactions").and_then(|v| v.as_i64()),
            comments: raw.get("comments").and_then(|v| v.as_i64()),
            topicality: raw
                .get("topicality")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.5)
                .clamp(0.0, 1.0),
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

pub fn to_signal(raw: RawPost, span: &Span) -> Signal {
    let time_confidence = briefbot_core::timeframe::date_confidence(raw.dated.as_deref(), span);
    Signal {
        key: raw.key,
        channel: Channel::Linkedin,
        headline: raw.headline,
        url: raw.url,
        byline: if raw.author.is_empty() {
            None
        } else {
            Some(raw.author)
        },
        blurb: None,
        dated: raw.dated,
        time_confidence,
        interaction: Interaction {
            reactions: raw.reactions,
            comments: raw.comments,
            ..Default::default()
        },
        topicality: raw.topicality,
        rationale: Some(raw.rationale),
        rank: 0,
        scorecard: Scorecard::default(),
        thread_notes: Vec::new(),
        notables: Vec::new(),
        extras: std::collections::HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_job_listing_urls() {
        let raw = json!({
            "output": "{\"posts\": [{\"headline\": \"a\", \"url\": \"https://www.linkedin.com/jobs/view/12345\"}]}"
        });
        assert!(parse_linkedin(&raw).is_empty());
    }

    #[test]
    fn accepts_post_permalinks() {
        let raw = json!({
            "output": "{\"posts\": [{\"headline\": \"a\", \"url\": \"https://www.linkedin.com/posts/someone_abc-activity-1\", \"author\": \"Someone\", \"reactions\": 120, \"comments\": 15}]}"
        });
        let posts = parse_linkedin(&raw);
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].key, "LI-01");
        assert_eq!(posts[0].reactions, Some(120));
    }
}

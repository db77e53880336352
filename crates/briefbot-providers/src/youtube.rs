//! YouTube discovery via an LLM web-search tool (spec §4.4), grounded on
//! `providers/youtube.py`.

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

const PROMPT: &str = "Locate YouTube videos related to: {topic}\n\n\
Window: {start} through {end}. Target {min}-{max} videos.\n\n\
Only return actual video URLs (youtube.com/watch?v= or youtu.be/). Skip playlists, channel \
pages, and handle pages.\n\n\
Return JSON only:\n\
{{\n  \"items\": [\n    {{\n      \"title\": \"Video title\",\n      \"url\": \"https://www.youtube.com/watch?v=...\",\n      \"channel_name\": \"Channel Name\",\n      \"date\": \"YYYY-MM-DD or null\",\n      \"views\": 12345,\n      \"likes\": 500,\n      \"description\": \"Short description or null\",\n      \"why_relevant\": \"Relevance explanation\",\n      \"relevance\": 0.85\n    }}\n  ]\n}}";

fn build_payload(model: &str, topic: &str, start: &str, end: &str, tier: SamplingTier) -> Value {
    let (min, max) = target_range(tier, Channel::Youtube);
    let prompt = PROMPT
        .replace("{topic}", topic)
        .replace("{start}", start)
        .replace("{end}", end)
        .replace("{min}", &min.to_string())
        .replace("{max}", &max.to_string());
    json!({
        "model": model,
        "input": [{"role": "user", "content": prompt}],
        "tools": [{"type": "web_search", "filters": {"allowed_domains": ["youtube.com", "youtu.be"]}}],
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

    let timeout = search_timeout(tier, Channel::Youtube);
    let (value, used_model) = with_model_fallback(candidates, "youtube", |candidate| {
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
pub struct RawVideo {
    pub key: String,
    pub title: String,
    pub url: String,
    pub channel_name: String,
    pub dated: Option<String>,
    pub views: Option<i64>,
    pub likes: Option<i64>,
    pub description: Option<String>,
    pub topicality: f64,
    pub rationale: String,
}

fn is_iso_date(s: &str) -> bool {
    s.len() == 10 && s.as_bytes()[4] == b'-' && s.as_bytes()[7] == b'-'
}

pub fn parse_youtube(raw_response: &Value) -> Vec<RawVideo> {
    if let Some(err) = raw_response.get("error") {
        warn!(error = %err, "youtube provider: api returned an error payload");
        return Vec::new();
    }

    let text = extract_model_text(raw_response);
    if text.is_empty() {
        return Vec::new();
    }
    let Some(obj) = first_object_with_array(&text, "items") else {
        return Vec::new();
    };
    let Some(items) = obj.get("items").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for raw in items {
        let Some(url) = raw.get("url").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) else {
            continue;
        };
        if !url.contains("youtube.com") && !url.contains("youtu.be") {
            continue;
        }
        if url.contains("/playlist") || url.contains("/channel/") || url.contains("/@") {
            continue;
        }
        let dated = raw
            .get("date")
            .and_then(|v| v.as_str())
            .filter(|d| is_iso_date(d))
            .map(str::to_string);

        out.push(RawVideo {
            key: format!("YT-{:02}", out.len() + 1),
            title: raw.get("title").and_then(|v| v.as_str()).unwrap_or("").trim().to_string(),
            url: url.to_string(),
            channel_name: raw
                .get("channel_name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim()
                .to_string(),
            dated,
            views: raw.get("views").and_then(|v| v.as_i64()),
            likes: raw.get("likes").and_then(|v| v.as_i64()),
            description: raw
                .get("description")
                .and_then(|v| v.as_str())
                .map(|s| s.chars().take(300).collect()),
            topicality: raw
                .get("relevance")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.5)
                .clamp(0.0, 1.0),
            rationale: raw
                .get("why_relevant")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .trim()
                .to_string(),
        });
    }
    out
}

pub fn to_signal(raw: RawVideo, span: &Span) -> Signal {
    let time_confidence = briefbot_core::timeframe::date_confidence(raw.dated.as_deref(), span);
    let mut extras = std::collections::HashMap::new();
    if !raw.channel_name.is_empty() {
        extras.insert("channel_name".to_string(), raw.channel_name.clone());
    }
    Signal {
        key: raw.key,
        channel: Channel::Youtube,
        headline: raw.title,
        url: raw.url,
        byline: if raw.channel_name.is_empty() {
            None
        } else {
            Some(raw.channel_name)
        },
        blurb: raw.description,
        dated: raw.dated,
        time_confidence,
        interaction: Interaction {
            views: raw.views,
            likes: raw.likes,
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
    fn rejects_playlists_and_channel_pages() {
        let raw = json!({
            "output": "{\"items\": [{\"title\": \"a\", \"url\": \"https://youtube.com/playlist?list=1\"}, {\"title\": \"b\", \"url\": \"https://youtube.com/channel/abc\"}, {\"title\": \"c\", \"url\": \"https://youtube.com/@someone\"}]}"
        });
        assert!(parse_youtube(&raw).is_empty());
    }

    #[test]
    fn accepts_watch_and_short_link_urls() {
        let raw = json!({
            "output": "{\"items\": [{\"title\": \"a\", \"url\": \"https://www.youtube.com/watch?v=abc\", \"views\": 1000, \"likes\": 50}, {\"title\": \"b\", \"url\": \"https://youtu.be/xyz\"}]}"
        });
        let videos = parse_youtube(&raw);
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].key, "YT-01");
        assert_eq!(videos[0].views, Some(1000));
    }
}

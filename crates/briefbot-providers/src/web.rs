//! General web-result normalization (spec §4.4), grounded on
//! `providers/web.py`'s `process_results()`. Unlike the other providers,
//! web performs no network call of its own: the caller supplies raw
//! search hits (from whatever web-search tool invoked the run) and this
//! module filters, dates, and scores them.

use std::collections::HashSet;

use briefbot_core::content::{Channel, Interaction, Scorecard, Signal, Span};
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// Reddit and X are searched separately through their own providers, so a
/// generic web sweep excludes their domains to avoid double-counting.
static EXCLUDED_DOMAINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "reddit.com",
        "www.reddit.com",
        "old.reddit.com",
        "m.reddit.com",
        "twitter.com",
        "www.twitter.com",
        "x.com",
        "www.x.com",
        "nitter.net",
    ]
    .into_iter()
    .collect()
});

/// One raw web-search hit as handed to this module by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHit {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub relevance: Option<f64>,
    #[serde(default)]
    pub why_relevant: String,
}

#[derive(Debug, Clone)]
pub struct RawWebItem {
    pub key: String,
    pub title: String,
    pub url: String,
    pub domain: String,
    pub snippet: String,
    pub dated: Option<String>,
    pub topicality: f64,
    pub rationale: String,
}

fn domain_of(raw_url: &str) -> String {
    Url::parse(raw_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .map(|host| {
            host.to_lowercase()
                .strip_prefix("www.")
                .map(str::to_string)
                .unwrap_or(host.to_lowercase())
        })
        .unwrap_or_default()
}

fn is_excluded(raw_url: &str) -> bool {
    Url::parse(raw_url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .map(|host| EXCLUDED_DOMAINS.contains(host.as_str()))
        .unwrap_or(false)
}

fn is_iso_date(s: &str) -> bool {
    s.len() == 10
        && s.as_bytes()[4] == b'-'
        && s.as_bytes()[7] == b'-'
        && s.bytes().enumerate().all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

/// Filters, dates, and scores raw web hits against the run's window.
/// Mirrors `web.py::process_results`: verified dates outside `[start,
/// end]` are hard-dropped before scoring ever sees them.
pub fn process_results(raw_results: &[RawHit], start: &str, end: &str) -> Vec<RawWebItem> {
    let mut out = Vec::new();

    for raw in raw_results {
        if raw.url.is_empty() || is_excluded(&raw.url) {
            continue;
        }
        let title = raw.title.trim();
        let snippet = raw.snippet.trim();
        if title.is_empty() && snippet.is_empty() {
            continue;
        }

        let (dated, _confidence) = match raw.date.as_deref().filter(|d| is_iso_date(d)) {
            Some(d) => (Some(d.to_string()), briefbot_core::content::TimeConfidence::Soft),
            None => {
                let (detected, confidence) =
                    briefbot_core::timeframe::detect_date(&raw.url, snippet, title);
                (detected, confidence)
            }
        };

        if let Some(d) = dated.as_deref() {
            if !start.is_empty() && d < start {
                continue;
            }
            if !end.is_empty() && d > end {
                continue;
            }
        }

        let topicality = raw.relevance.unwrap_or(0.45).clamp(0.0, 1.0);

        out.push(RawWebItem {
            key: format!("W-{:02}", out.len() + 1),
            title: title.chars().take(250).collect(),
            url: raw.url.clone(),
            domain: domain_of(&raw.url),
            snippet: snippet.chars().take(400).collect(),
            dated,
            topicality,
            rationale: raw.why_relevant.trim().to_string(),
        });
    }

    out
}

/// Removes duplicate items by normalized URL: lowercased, `www.` stripped,
/// query string dropped, trailing slash removed.
pub fn dedup_urls(items: Vec<RawWebItem>) -> Vec<RawWebItem> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for item in items {
        let mut normalized = item.url.to_lowercase();
        normalized = normalized.trim_end_matches('/').to_string();
        normalized = normalized.replacen("://www.", "://", 1);
        if let Some(idx) = normalized.find('?') {
            normalized.truncate(idx);
        }
        if seen.insert(normalized) {
            unique.push(item);
        }
    }
    unique
}

pub fn to_signal(raw: RawWebItem, span: &Span) -> Signal {
    let time_confidence = briefbot_core::timeframe::date_confidence(raw.dated.as_deref(), span);
    let mut extras = std::collections::HashMap::new();
    if !raw.domain.is_empty() {
        extras.insert("domain".to_string(), raw.domain.clone());
    }
    Signal {
        key: raw.key,
        channel: Channel::Web,
        headline: raw.title,
        url: raw.url,
        byline: if raw.domain.is_empty() {
            None
        } else {
            Some(raw.domain)
        },
        blurb: if raw.snippet.is_empty() {
            None
        } else {
            Some(raw.snippet)
        },
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

/// Deserializes a caller-supplied raw web-results JSON array (as handed
/// to the pipeline from a fixture or an external search tool).
pub fn parse_raw_hits(value: &Value) -> Vec<RawHit> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| serde_json::from_value::<RawHit>(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(url: &str, date: Option<&str>) -> RawHit {
        RawHit {
            url: url.to_string(),
            title: "A title".to_string(),
            snippet: "A snippet".to_string(),
            date: date.map(str::to_string),
            relevance: Some(0.7),
            why_relevant: "matches topic".to_string(),
        }
    }

    #[test]
    fn excludes_reddit_and_x_domains() {
        let raw = vec![
            hit("https://www.reddit.com/r/rust/1", None),
            hit("https://x.com/u/status/1", None),
        ];
        assert!(process_results(&raw, "", "").is_empty());
    }

    #[test]
    fn hard_filters_dates_outside_window() {
        let raw = vec![hit("https://example.com/a", Some("2020-01-01"))];
        assert!(process_results(&raw, "2026-01-01", "2026-02-01").is_empty());
    }

    #[test]
    fn keeps_items_within_window_and_assigns_keys() {
        let raw = vec![
            hit("https://example.com/a", Some("2026-01-15")),
            hit("https://example.org/b", Some("2026-01-20")),
        ];
        let items = process_results(&raw, "2026-01-01", "2026-02-01");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].key, "W-01");
        assert_eq!(items[1].key, "W-02");
        assert_eq!(items[0].domain, "example.com");
    }

    #[test]
    fn dedup_strips_www_and_query_and_trailing_slash() {
        let a = RawWebItem {
            key: "W-01".into(),
            title: "a".into(),
            url: "https://www.example.com/page/?ref=x".into(),
            domain: "example.com".into(),
            snippet: "".into(),
            dated: None,
            topicality: 0.5,
            rationale: "".into(),
        };
        let b = RawWebItem {
            key: "W-02".into(),
            url: "https://example.com/page".into(),
            ..a.clone()
        };
        assert_eq!(dedup_urls(vec![a, b]).len(), 1);
    }
}

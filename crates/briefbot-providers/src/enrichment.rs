//! Reddit thread enrichment (spec §4.5), grounded on `lib/reddit_enrich.py`.
//! Runs sequentially after the concurrent provider fan-out: one HTTP call
//! per Reddit signal against Reddit's public JSON endpoint.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use briefbot_core::content::{Signal, ThreadNote};
use briefbot_core::timeframe::to_iso_date;
use briefbot_net::{reddit_json_url, HttpClient};

const MAX_THREAD_NOTES: usize = 10;
const MAX_NOTABLES: usize = 6;
const NOTABLE_SCAN_LIMIT: usize = 24;
const NOTABLE_MIN_LEN: usize = 28;
const NOTABLE_MAX_LEN: usize = 190;
const NOTABLE_BOUNDARY_FLOOR: usize = 70;

static LOW_VALUE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(this|same|agreed|exactly|yep|nope|yes|no|thanks|thank you)\.?$",
        r"^lol|lmao|haha",
        r"^\[deleted\]",
        r"^\[removed\]",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

#[derive(Debug, Clone)]
struct RawComment {
    score: i64,
    created_utc: Option<f64>,
    author: String,
    body: String,
    permalink: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct ThreadComponents {
    submission: Option<Submission>,
    comments: Vec<RawComment>,
}

#[derive(Debug, Clone)]
struct Submission {
    score: Option<i64>,
    num_comments: Option<i64>,
    upvote_ratio: Option<f64>,
    created_utc: Option<f64>,
}

fn extract_thread_components(raw: &Value) -> ThreadComponents {
    let mut out = ThreadComponents::default();
    let Some(arr) = raw.as_array() else {
        return out;
    };
    if let Some(listing) = arr.first() {
        if let Some(first_child) = listing
            .pointer("/data/children/0/data")
        {
            out.submission = Some(Submission {
                score: first_child.get("score").and_then(Value::as_i64),
                num_comments: first_child.get("num_comments").and_then(Value::as_i64),
                upvote_ratio: first_child.get("upvote_ratio").and_then(Value::as_f64),
                created_utc: first_child.get("created_utc").and_then(Value::as_f64),
            });
        }
    }
    if let Some(listing) = arr.get(1) {
        if let Some(children) = listing.pointer("/data/children").and_then(Value::as_array) {
            for child in children {
                if child.get("kind").and_then(Value::as_str) != Some("t1") {
                    continue;
                }
                let data = child.get("data").cloned().unwrap_or(Value::Null);
                let Some(body) = data.get("body").and_then(Value::as_str).filter(|b| !b.is_empty()) else {
                    continue;
                };
                out.comments.push(RawComment {
                    score: data.get("score").and_then(Value::as_i64).unwrap_or(0),
                    created_utc: data.get("created_utc").and_then(Value::as_f64),
                    author: data
                        .get("author")
                        .and_then(Value::as_str)
                        .unwrap_or("[deleted]")
                        .to_string(),
                    body: body.chars().take(300).collect(),
                    permalink: data.get("permalink").and_then(Value::as_str).map(str::to_string),
                });
            }
        }
    }
    out
}

fn select_top_comments(comments: &[RawComment], max: usize) -> Vec<&RawComment> {
    let mut valid: Vec<&RawComment> = comments
        .iter()
        .filter(|c| c.author != "[deleted]" && c.author != "[removed]")
        .collect();
    valid.sort_by(|a, b| b.score.cmp(&a.score));
    valid.truncate(max);
    valid
}

fn is_low_value(body_lower: &str) -> bool {
    LOW_VALUE_PATTERNS.iter().any(|re| re.is_match(body_lower))
}

fn distill_notables(top_comments: &[&RawComment]) -> Vec<String> {
    let mut out = Vec::new();
    for comment in top_comments.iter().take(NOTABLE_SCAN_LIMIT) {
        let body = comment.body.trim();
        if body.chars().count() < NOTABLE_MIN_LEN {
            continue;
        }
        if is_low_value(&body.to_lowercase()) {
            continue;
        }

        let chars: Vec<char> = body.chars().collect();
        let mut excerpt: String = chars.iter().take(NOTABLE_MAX_LEN).collect();
        if chars.len() > NOTABLE_MAX_LEN {
            let mut boundary_found = false;
            for (idx, ch) in excerpt.chars().enumerate() {
                if matches!(ch, '.' | '!' | '?') && idx > NOTABLE_BOUNDARY_FLOOR {
                    excerpt = excerpt.chars().take(idx + 1).collect();
                    boundary_found = true;
                    break;
                }
            }
            if !boundary_found {
                excerpt = format!("{}...", excerpt.trim_end());
            }
        }
        out.push(excerpt);
        if out.len() >= MAX_NOTABLES {
            break;
        }
    }
    out
}

/// Fetches the thread's JSON and overwrites engagement fields, thread
/// notes, and notables on `signal` in place. Any failure (network error,
/// unexpected shape) leaves `signal` untouched and is non-fatal.
pub async fn enrich_reddit_signal(http: &HttpClient, signal: &mut Signal, mock: Option<Value>) {
    if !signal.url.contains("reddit.com") {
        return;
    }

    let raw = match mock {
        Some(fixture) => fixture,
        None => {
            let endpoint = reddit_json_url(&signal.url);
            match http
                .get_json(&endpoint, std::time::Duration::from_secs(20))
                .await
            {
                Ok(v) => v,
                Err(err) => {
                    warn!(url = %signal.url, error = %err, "reddit enrichment: fetch failed");
                    return;
                }
            }
        }
    };

    // `HttpClient::request_json` wraps a bare top-level JSON array (what
    // Reddit's endpoint actually returns) as `{"data": [...]}`; mock
    // fixtures may supply the array directly, so accept either shape.
    let thread_array = raw.get("data").filter(|d| d.is_array()).unwrap_or(&raw);
    let components = extract_thread_components(thread_array);

    if let Some(submission) = components.submission {
        signal.interaction.upvotes = submission.score;
        signal.interaction.comments = submission.num_comments;
        signal.interaction.vote_ratio = submission.upvote_ratio;
        if let Some(created) = submission.created_utc {
            if let Some(iso) = to_iso_date(created as i64) {
                signal.dated = Some(iso);
            }
        }
    }

    let top_comments = select_top_comments(&components.comments, MAX_THREAD_NOTES);
    signal.thread_notes = top_comments
        .iter()
        .map(|c| ThreadNote {
            score: Some(c.score),
            dated: c.created_utc.and_then(|ts| to_iso_date(ts as i64)),
            author: c.author.clone(),
            excerpt: c.body.chars().take(200).collect(),
            url: c
                .permalink
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(|p| format!("https://reddit.com{p}"))
                .unwrap_or_default(),
        })
        .collect();

    signal.notables = distill_notables(&top_comments);
}

#[cfg(test)]
mod tests {
    use super::*;
    use briefbot_core::content::{Channel, Interaction, Scorecard};
    use serde_json::json;

    fn base_signal() -> Signal {
        Signal {
            key: "RDT-01".into(),
            channel: Channel::Reddit,
            headline: "h".into(),
            url: "https://www.reddit.com/r/rust/comments/abc/x/".into(),
            byline: None,
            blurb: None,
            dated: None,
            time_confidence: briefbot_core::content::TimeConfidence::Unknown,
            interaction: Interaction::default(),
            topicality: 0.5,
            rationale: None,
            rank: 0,
            scorecard: Scorecard::default(),
            thread_notes: Vec::new(),
            notables: Vec::new(),
            extras: Default::default(),
        }
    }

    fn fixture(score: i64, comments: Vec<Value>) -> Value {
        json!([
            {"data": {"children": [{"data": {"score": score, "num_comments": comments.len(), "upvote_ratio": 0.9, "created_utc": 1700000000.0}}]}},
            {"data": {"children": comments}},
        ])
    }

    fn comment(kind: &str, author: &str, score: i64, body: &str) -> Value {
        json!({
            "kind": kind,
            "data": {"score": score, "author": author, "body": body, "permalink": "/r/rust/comments/abc/x/c1/", "created_utc": 1700000000.0},
        })
    }

    #[tokio::test]
    async fn overwrites_engagement_and_collects_notables() {
        let mut signal = base_signal();
        let long_body = "This is a genuinely substantive comment with real detail about the topic at hand and more.";
        let mock = fixture(
            500,
            vec![
                comment("t1", "alice", 50, long_body),
                comment("t1", "[deleted]", 999, "ignored"),
                comment("t1", "bob", 10, "same"),
            ],
        );
        let http = HttpClient::new();
        enrich_reddit_signal(&http, &mut signal, Some(mock)).await;

        assert_eq!(signal.interaction.upvotes, Some(500));
        assert_eq!(signal.thread_notes.len(), 2);
        assert_eq!(signal.notables.len(), 1);
        assert!(signal.notables[0].starts_with("This is a genuinely substantive"));
    }

    #[test]
    fn low_value_patterns_are_filtered() {
        let comments = vec![RawComment {
            score: 1,
            created_utc: None,
            author: "x".into(),
            body: "thanks".into(),
            permalink: None,
        }];
        let top: Vec<&RawComment> = comments.iter().collect();
        assert!(distill_notables(&top).is_empty());
    }

    #[test]
    fn deleted_and_removed_authors_are_excluded_from_top_comments() {
        let comments = vec![
            RawComment {
                score: 100,
                created_utc: None,
                author: "[deleted]".into(),
                body: "x".into(),
                permalink: None,
            },
            RawComment {
                score: 1,
                created_utc: None,
                author: "real_user".into(),
                body: "y".into(),
                permalink: None,
            },
        ];
        let top = select_top_comments(&comments, 10);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].author, "real_user");
    }
}

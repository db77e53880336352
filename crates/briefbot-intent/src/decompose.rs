//! Optional LLM-backed query decomposition. Never required for a
//! pipeline run to succeed — any failure degrades to `"skipped"`.

use std::time::Duration;

use briefbot_net::HttpClient;
use serde_json::{json, Value};
use tracing::{debug, warn};

const DECOMPOSE_TIMEOUT_SECS: u64 = 22;
const DECOMPOSE_RETRIES: u32 = 2;
const OPENAI_RESPONSES_ENDPOINT: &str = "https://api.openai.com/v1/responses";
const MIN_SUBQUESTIONS: usize = 3;
const MAX_SUBQUESTIONS: usize = 5;

fn build_prompt(topic: &str) -> String {
    format!(
        "Decompose the user topic into 3-5 focused sub-questions.\n\
Aim for what/when/why/who/technical barrier coverage if relevant.\n\
Return JSON only in this format:\n\
{{\"subquestions\": [\"Q1\", \"Q2\", \"Q3\"]}}\n\
\n\
Topic: {topic}"
    )
}

/// Returns `(subquestions, source)` where `source` is `"llm"` on a
/// successful decomposition or `"skipped"` if no key was supplied, the
/// request failed, or the response could not be parsed.
pub async fn decompose_query(
    topic: &str,
    api_key: Option<&str>,
    model: Option<&str>,
) -> (Vec<String>, &'static str) {
    let (Some(key), Some(model)) = (api_key, model) else {
        debug!("query decomposition skipped: no api key or model configured");
        return (Vec::new(), "skipped");
    };

    let client = HttpClient::new();
    let body = json!({
        "model": model,
        "input": [{"role": "user", "content": build_prompt(topic)}],
        "max_output_tokens": 300,
    });

    let result = client
        .request_json(
            reqwest::Method::POST,
            OPENAI_RESPONSES_ENDPOINT,
            Some(vec![("Authorization", format!("Bearer {key}"))]),
            Some(&body),
            Duration::from_secs(DECOMPOSE_TIMEOUT_SECS),
            DECOMPOSE_RETRIES,
        )
        .await;

    let response = match result {
        Ok(body) => body,
        Err(err) => {
            warn!(error = %err, "query decomposition request failed");
            return (Vec::new(), "skipped");
        }
    };

    match extract_subquestions(&response) {
        Some(questions) => (questions, "llm"),
        None => {
            warn!("query decomposition response did not contain 3-5 usable subquestions");
            (Vec::new(), "skipped")
        }
    }
}

/// Pulls the model's text out of the Responses API's `output` array: either
/// an entry's own `text` field, or the first `text` found among its nested
/// `content[]` blocks.
fn extract_text(response: &Value) -> Option<String> {
    if let Some(entries) = response.get("output").and_then(|v| v.as_array()) {
        for entry in entries {
            if let Some(text) = entry.get("text").and_then(|t| t.as_str()) {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
            if let Some(blocks) = entry.get("content").and_then(|c| c.as_array()) {
                for block in blocks {
                    if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                        let trimmed = text.trim();
                        if !trimmed.is_empty() {
                            return Some(trimmed.to_string());
                        }
                    }
                }
            }
        }
    }
    response
        .get("text")
        .and_then(|t| t.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parses `raw` as JSON, falling back to the first balanced `{...}` block
/// found inside it if the whole string doesn't parse directly.
fn parse_json_block(raw: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(raw) {
        return Some(value);
    }
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&raw[start..=end]).ok()
}

/// Requires 3-5 sub-questions back (spec §4.6); any other count is treated
/// as a failed decomposition.
fn extract_subquestions(response: &Value) -> Option<Vec<String>> {
    let text = extract_text(response)?;
    let parsed = parse_json_block(&text)?;
    let items = parsed.get("subquestions")?.as_array()?;
    let questions: Vec<String> = items
        .iter()
        .filter_map(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if (MIN_SUBQUESTIONS..=MAX_SUBQUESTIONS).contains(&questions.len()) {
        Some(questions)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_skips_without_network_call() {
        let (questions, source) = decompose_query("rust async runtimes", None, Some("gpt-5")).await;
        assert!(questions.is_empty());
        assert_eq!(source, "skipped");
    }

    #[tokio::test]
    async fn missing_model_skips_without_network_call() {
        let (questions, source) = decompose_query("rust async runtimes", Some("sk-test"), None).await;
        assert!(questions.is_empty());
        assert_eq!(source, "skipped");
    }

    #[test]
    fn extracts_subquestions_from_responses_output_text_field() {
        let response = json!({
            "output": [
                {"text": "{\"subquestions\": [\"what is tokio\", \"what is async-std\", \"what is smol\"]}"}
            ]
        });
        let questions = extract_subquestions(&response).unwrap();
        assert_eq!(questions, vec!["what is tokio", "what is async-std", "what is smol"]);
    }

    #[test]
    fn extracts_subquestions_from_nested_content_blocks() {
        let response = json!({
            "output": [
                {"content": [{"type": "output_text", "text": "{\"subquestions\": [\"a\", \"b\", \"c\"]}"}]}
            ]
        });
        let questions = extract_subquestions(&response).unwrap();
        assert_eq!(questions, vec!["a", "b", "c"]);
    }

    #[test]
    fn tolerates_surrounding_prose_around_the_json_block() {
        let response = json!({
            "output": [
                {"text": "Sure, here you go:\n{\"subquestions\": [\"a\", \"b\", \"c\"]}\nhope that helps"}
            ]
        });
        let questions = extract_subquestions(&response).unwrap();
        assert_eq!(questions, vec!["a", "b", "c"]);
    }

    #[test]
    fn fewer_than_three_subquestions_is_rejected() {
        let response = json!({
            "output": [{"text": "{\"subquestions\": [\"only one\", \"two\"]}"}]
        });
        assert!(extract_subquestions(&response).is_none());
    }

    #[test]
    fn more_than_five_subquestions_is_rejected() {
        let response = json!({
            "output": [{"text": "{\"subquestions\": [\"a\", \"b\", \"c\", \"d\", \"e\", \"f\"]}"}]
        });
        assert!(extract_subquestions(&response).is_none());
    }

    #[test]
    fn malformed_content_yields_none() {
        let response = json!({"output": [{"text": "not json"}]});
        assert!(extract_subquestions(&response).is_none());
    }
}

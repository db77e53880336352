//! Defensive extraction of JSON objects embedded in free-form LLM text
//! output, and tolerance for the handful of response shapes real LLM APIs
//! actually return (spec §4.4 "Parsing robustness").

use serde_json::Value;

/// Pulls the model's free-form text out of one of the shapes a responses-style
/// API is known to return: plain string `output`, `output` as a list of
/// `{content: [{type: "output_text", text}]}` blocks, or legacy
/// `choices[].message.content`.
pub fn extract_model_text(raw: &Value) -> String {
    if let Some(s) = raw.get("output").and_then(|v| v.as_str()) {
        return s.to_string();
    }
    if let Some(items) = raw.get("output").and_then(|v| v.as_array()) {
        let mut combined = String::new();
        for item in items {
            if let Some(blocks) = item.get("content").and_then(|c| c.as_array()) {
                for block in blocks {
                    if block.get("type").and_then(|t| t.as_str()) == Some("output_text") {
                        if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                            combined.push_str(text);
                        }
                    }
                }
            }
        }
        if !combined.is_empty() {
            return combined;
        }
    }
    if let Some(content) = raw
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
    {
        return content.to_string();
    }
    String::new()
}

/// Scans `text` for every balanced top-level `{...}` substring (respecting
/// quoted strings and escapes) and returns the ones that parse as JSON,
/// in order of appearance.
pub fn scan_json_objects(text: &str) -> Vec<Value> {
    let chars: Vec<char> = text.chars().collect();
    let mut objects = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '{' {
            if let Some(end) = find_matching_brace(&chars, i) {
                let candidate: String = chars[i..=end].iter().collect();
                if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
                    objects.push(value);
                }
                i = end + 1;
                continue;
            }
        }
        i += 1;
    }
    objects
}

fn find_matching_brace(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Returns the first scanned object that has an array under `key`.
pub fn first_object_with_array(text: &str, key: &str) -> Option<Value> {
    scan_json_objects(text)
        .into_iter()
        .find(|v| v.get(key).map(|a| a.is_array()).unwrap_or(false))
}

//! Mock-mode fixture loading (spec §6): when `mock=true`, each provider's
//! raw response is read from a JSON file in the configured fixtures
//! directory instead of hitting the network.

use std::path::Path;

use serde_json::Value;
use tracing::warn;

pub const OPENAI_SAMPLE: &str = "openai_sample.json";
pub const XAI_SAMPLE: &str = "xai_sample.json";
pub const YOUTUBE_SAMPLE: &str = "youtube_sample.json";
pub const LINKEDIN_SAMPLE: &str = "linkedin_sample.json";
pub const REDDIT_THREAD_SAMPLE: &str = "reddit_thread_sample.json";

/// Reads `<fixtures_dir>/<file_name>` and parses it as JSON. Returns
/// `None` (never an error) if the file is missing or malformed — mock
/// mode degrades to "provider returns nothing" rather than failing the
/// run, matching the non-fatal-parse-error policy elsewhere in the
/// pipeline.
pub fn load_fixture(fixtures_dir: &str, file_name: &str) -> Option<Value> {
    let path = Path::new(fixtures_dir).join(file_name);
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "fixture is not valid JSON");
                None
            }
        },
        Err(err) => {
            warn!(path = %path.display(), error = %err, "fixture file not found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fixture_returns_none() {
        assert!(load_fixture("/nonexistent/dir", OPENAI_SAMPLE).is_none());
    }

    #[test]
    fn reads_and_parses_a_real_fixture() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(XAI_SAMPLE), r#"{"posts": []}"#).unwrap();
        let value = load_fixture(dir.path().to_str().unwrap(), XAI_SAMPLE).unwrap();
        assert_eq!(value, serde_json::json!({"posts": []}));
    }
}

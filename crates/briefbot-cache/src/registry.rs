//! Model-selection registry: per-provider preferences persisted with a
//! longer TTL than response caching, plus the OpenAI/xAI selection
//! algorithms themselves. The registry is a leaf — it has no
//! provider-specific knowledge beyond these two well-known APIs, and callers
//! pass mock listings straight through rather than the registry reaching
//! into provider modules (spec §9's "cyclic module imports" fix).

use std::time::Duration;

use briefbot_core::config::ModelPolicy;
use briefbot_net::HttpClient;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::ResponseCache;

pub const MODEL_TTL_DAYS: f64 = 4.0;
const MODEL_TTL_HOURS: f64 = MODEL_TTL_DAYS * 24.0;
const MODEL_PREFS_FILE: &str = "model_prefs";

pub const OPENAI_DEFAULT_MODELS: &[&str] = &["gpt-5.2", "gpt-5.1", "gpt-5", "gpt-4.1", "gpt-4o"];
const OPENAI_MODEL_LISTING_ENDPOINT: &str = "https://api.openai.com/v1/models";
const OPENAI_BLOCKLIST: &[&str] = &[
    "mini",
    "nano",
    "chat",
    "codex",
    "preview",
    "turbo",
    "experimental",
    "snapshot",
];

pub const XAI_HARDCODED_FALLBACK: &str = "grok-4-fast";
pub const XAI_MODEL_PREFERENCE: &[&str] = &[
    "grok-4-fast",
    "grok-4-1-fast",
    "grok-4-1-fast-non-reasoning",
    "grok-4-1-non-reasoning",
    "grok-4-1",
    "grok-4-non-reasoning",
    "grok-4",
];
const XAI_MODEL_LISTING_ENDPOINT: &str = "https://api.x.ai/v1/models";

fn standard_gpt_pattern() -> Regex {
    Regex::new(r"^gpt-5(\.\d+)*$").unwrap()
}

fn is_standard_gpt_model(id: &str) -> bool {
    let lower = id.to_ascii_lowercase();
    standard_gpt_pattern().is_match(&lower)
        && !OPENAI_BLOCKLIST.iter().any(|bad| lower.contains(bad))
}

/// Extracts the dot-separated numeric version tuple from a model id, e.g.
/// `"gpt-5.2"` -> `[5, 2]`. Non-numeric trailing segments are ignored.
fn extract_version_tuple(id: &str) -> Vec<i64> {
    id.split(|c: char| c == '-' || c == '.')
        .filter_map(|part| part.parse::<i64>().ok())
        .collect()
}

/// Registry for response-cache-adjacent model preferences. Wraps a
/// [`ResponseCache`]-style directory but keeps its own `model_prefs.json`
/// with a longer TTL, matching the spec's "separate, longer TTL" contract.
pub struct ModelRegistry {
    cache: ResponseCache,
    net: HttpClient,
}

impl ModelRegistry {
    pub fn new(cache_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            cache: ResponseCache::new(cache_dir),
            net: HttpClient::new(),
        }
    }

    pub fn get_cached_model(&self, provider: &str) -> Option<String> {
        let prefs = self.cache.load(MODEL_PREFS_FILE, MODEL_TTL_HOURS)?;
        prefs.get(provider)?.as_str().map(str::to_string)
    }

    pub fn set_cached_model(&self, provider: &str, model: &str) {
        let mut prefs = self
            .cache
            .load(MODEL_PREFS_FILE, f64::MAX)
            .unwrap_or_else(|| serde_json::json!({}));
        if let Value::Object(map) = &mut prefs {
            map.insert(provider.to_string(), Value::from(model));
            map.insert(
                "updated_at".to_string(),
                Value::from(chrono::Utc::now().to_rfc3339()),
            );
        }
        self.cache.save(MODEL_PREFS_FILE, &prefs);
    }

    async fn list_model_ids(&self, endpoint: &str, api_key: &str) -> Vec<String> {
        let result = self
            .net
            .request_json(
                reqwest::Method::GET,
                endpoint,
                Some(vec![("Authorization", format!("Bearer {api_key}"))]),
                None,
                Duration::from_secs(10),
                2,
            )
            .await;
        match result {
            Ok(body) => body
                .get("data")
                .and_then(|d| d.as_array())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.get("id").and_then(|id| id.as_str()))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            Err(err) => {
                warn!(endpoint, error = %err, "model listing fetch failed");
                Vec::new()
            }
        }
    }

    /// `policy=pinned` returns the pin. `policy=auto`: returns a fresh cached
    /// selection if present, else lists models, filters to "standard GPT"
    /// identifiers, picks the highest version, and persists it.
    pub async fn choose_openai_model(
        &self,
        policy: ModelPolicy,
        pin: Option<&str>,
        mock_list: Option<Vec<String>>,
        api_key: &str,
    ) -> Option<String> {
        if policy == ModelPolicy::Pinned {
            return pin.map(str::to_string);
        }
        if let Some(cached) = self.get_cached_model("openai") {
            debug!(model = %cached, "using cached openai model selection");
            return Some(cached);
        }

        let candidates = match mock_list {
            Some(list) => list,
            None => self.list_model_ids(OPENAI_MODEL_LISTING_ENDPOINT, api_key).await,
        };

        let mut standard: Vec<&String> = candidates.iter().filter(|id| is_standard_gpt_model(id)).collect();
        standard.sort_by(|a, b| extract_version_tuple(b).cmp(&extract_version_tuple(a)));

        let chosen = standard
            .first()
            .map(|s| s.to_string())
            .unwrap_or_else(|| OPENAI_DEFAULT_MODELS[0].to_string());

        self.set_cached_model("openai", &chosen);
        Some(chosen)
    }

    pub async fn discover_xai_models(&self, api_key: &str) -> Vec<String> {
        self.list_model_ids(XAI_MODEL_LISTING_ENDPOINT, api_key).await
    }

    /// `policy=pinned` returns the pin. `policy=latest`: fresh cache wins;
    /// otherwise matches the live/mock listing against
    /// [`XAI_MODEL_PREFERENCE`] in order, falls back to the
    /// first `grok-4*` candidate alphabetically, then to
    /// [`XAI_HARDCODED_FALLBACK`]; always persists the result.
    pub async fn choose_xai_model(
        &self,
        policy: ModelPolicy,
        pin: Option<&str>,
        mock_list: Option<Vec<String>>,
        api_key: &str,
    ) -> Option<String> {
        if policy == ModelPolicy::Pinned {
            return pin.map(str::to_string);
        }
        if let Some(cached) = self.get_cached_model("xai") {
            debug!(model = %cached, "using cached xai model selection");
            return Some(cached);
        }

        let candidates = match mock_list {
            Some(list) => list,
            None => self.discover_xai_models(api_key).await,
        };

        let chosen = XAI_MODEL_PREFERENCE
            .iter()
            .find(|pref| candidates.iter().any(|c| c == *pref))
            .map(|s| s.to_string())
            .or_else(|| {
                let mut grok4: Vec<&String> =
                    candidates.iter().filter(|c| c.starts_with("grok-4")).collect();
                grok4.sort();
                grok4.first().map(|s| s.to_string())
            })
            .unwrap_or_else(|| XAI_HARDCODED_FALLBACK.to_string());

        self.set_cached_model("xai", &chosen);
        Some(chosen)
    }
}

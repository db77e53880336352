//! Credentials and run configuration (TOML file + `BRIEFBOT_*` env overrides).

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ContentError, Result};

/// Model-selection policy for a provider that supports automatic discovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelPolicy {
    Pinned,
    Auto,
}

impl Default for ModelPolicy {
    fn default() -> Self {
        ModelPolicy::Auto
    }
}

/// OpenAI credential + model-selection policy. Absence of this struct (the
/// whole `Option` is `None`) disables Reddit/YouTube/LinkedIn discovery,
/// since those providers are LLM-backed through the OpenAI-compatible
/// responses endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiCredential {
    pub api_key: String,
    #[serde(default)]
    pub model_policy: ModelPolicy,
    pub model_pin: Option<String>,
}

/// xAI credential + model-selection policy. Absence disables the X channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XaiCredential {
    pub api_key: String,
    #[serde(default)]
    pub model_policy: ModelPolicy,
    pub model_pin: Option<String>,
}

/// `ProvidersConfig`-equivalent: one `Option<T>` per credential so that
/// absence of a key disables exactly the channel it belongs to (spec §6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    pub openai: Option<OpenAiCredential>,
    pub xai: Option<XaiCredential>,
}

impl Credentials {
    pub fn has_openai(&self) -> bool {
        self.openai.is_some()
    }

    pub fn has_xai(&self) -> bool {
        self.xai.is_some()
    }
}

/// Sampling tier governing target item counts and per-provider timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingTier {
    Lite,
    Standard,
    Dense,
}

impl Default for SamplingTier {
    fn default() -> Self {
        SamplingTier::Standard
    }
}

/// Top-level run configuration (briefbot.toml + `BRIEFBOT_*` env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub sampling: SamplingTier,
    /// Directory fixtures are read from when `mock=true`.
    pub fixtures_dir: Option<String>,
    /// Per-user cache directory override; defaults to `~/.cache/briefbot`.
    pub cache_dir: Option<String>,
}

impl RunConfig {
    /// Load config from a TOML file with `BRIEFBOT_*` env var overrides,
    /// following the teacher's figment-layering pattern exactly.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: RunConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("BRIEFBOT_").split("_"))
            .extract()
            .map_err(|e| ContentError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.briefbot/briefbot.toml", home)
}

pub fn default_cache_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cache/briefbot", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_default_has_no_channels() {
        let creds = Credentials::default();
        assert!(!creds.has_openai());
        assert!(!creds.has_xai());
    }

    #[test]
    fn load_missing_file_falls_back_to_defaults() {
        let config = RunConfig::load(Some("/nonexistent/briefbot.toml")).unwrap();
        assert!(!config.credentials.has_openai());
        assert_eq!(config.sampling, SamplingTier::Standard);
    }
}

//! File-backed, content-addressed response cache. Reads never block on
//! network; writes are atomic (write-then-rename) and best-effort — a write
//! failure is logged and swallowed, never propagated, since the cache is
//! never authoritative for correctness (spec §7).

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::Result;

pub const DEFAULT_TTL_HOURS: f64 = 20.0;
const KEY_HEX_LEN: usize = 20;

/// `sha256("topic|start|end|channel")`, truncated to 20 hex characters —
/// inside the spec's stated 16..20 hex range.
pub fn cache_key(topic: &str, start: &str, end: &str, channel_set: &str) -> String {
    let composite = format!("{topic}|{start}|{end}|{channel_set}");
    let digest = Sha256::digest(composite.as_bytes());
    hex::encode(digest)[..KEY_HEX_LEN].to_string()
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub size_bytes: u64,
}

pub struct ResponseCache {
    dir: PathBuf,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn age_hours(path: &Path) -> Option<f64> {
        let metadata = std::fs::metadata(path).ok()?;
        let modified = metadata.modified().ok()?;
        let elapsed = SystemTime::now().duration_since(modified).ok()?;
        Some(elapsed.as_secs_f64() / 3600.0)
    }

    fn is_valid(path: &Path, ttl_hours: f64) -> bool {
        match Self::age_hours(path) {
            Some(age) => age < ttl_hours,
            None => false,
        }
    }

    /// Returns the cached object iff the file's mtime is within `ttl_hours`.
    pub fn load(&self, key: &str, ttl_hours: f64) -> Option<Value> {
        self.load_with_age(key, ttl_hours).0
    }

    pub fn load_with_age(&self, key: &str, ttl_hours: f64) -> (Option<Value>, Option<f64>) {
        let path = self.path_for(key);
        if !Self::is_valid(&path, ttl_hours) {
            return (None, None);
        }
        let age = Self::age_hours(&path);
        let data = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok());
        (data, age)
    }

    /// Writes atomically: serialize to a sibling temp file, then rename over
    /// the destination. Failures are logged and swallowed (best-effort).
    pub fn save(&self, key: &str, obj: &Value) {
        if let Err(err) = self.try_save(key, obj) {
            warn!(key, error = %err, "cache write failed, ignoring");
        }
    }

    fn try_save(&self, key: &str, obj: &Value) -> Result<()> {
        self.ensure_dir()?;
        let final_path = self.path_for(key);
        let tmp_path = self.dir.join(format!("{key}.json.tmp-{}", std::process::id()));
        std::fs::write(&tmp_path, serde_json::to_vec(obj)?)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return stats;
        };
        for entry in entries.flatten() {
            if entry.path().extension().and_then(|e| e.to_str()) == Some("json") {
                stats.entries += 1;
                if let Ok(meta) = entry.metadata() {
                    stats.size_bytes += meta.len();
                }
            }
        }
        stats
    }

    /// Removes every cached response, skipping `model_prefs.json`.
    pub fn clear_all(&self) {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.file_name().and_then(|n| n.to_str()) == Some("model_prefs.json") {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                let _ = std::fs::remove_file(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_deterministic_and_in_range() {
        let a = cache_key("rust async", "2026-01-01", "2026-01-31", "all");
        let b = cache_key("rust async", "2026-01-01", "2026-01-31", "all");
        assert_eq!(a, b);
        assert_eq!(a.len(), KEY_HEX_LEN);
        assert!(a.len() >= 16 && a.len() <= 20);
    }

    #[test]
    fn cache_key_differs_on_any_input_change() {
        let a = cache_key("rust", "2026-01-01", "2026-01-31", "all");
        let b = cache_key("rust", "2026-01-01", "2026-01-31", "reddit");
        assert_ne!(a, b);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path());
        let key = "abc123";
        let value = serde_json::json!({"topic": "rust"});
        cache.save(key, &value);
        let loaded = cache.load(key, DEFAULT_TTL_HOURS);
        assert_eq!(loaded, Some(value));
    }

    #[test]
    fn load_misses_when_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path());
        assert_eq!(cache.load("missing", DEFAULT_TTL_HOURS), None);
    }

    #[test]
    fn clear_all_skips_model_prefs() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path());
        cache.save("a", &serde_json::json!({}));
        std::fs::write(dir.path().join("model_prefs.json"), "{}").unwrap();
        cache.clear_all();
        assert!(!dir.path().join("a.json").exists());
        assert!(dir.path().join("model_prefs.json").exists());
    }
}

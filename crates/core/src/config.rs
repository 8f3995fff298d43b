use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled value: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_opt<F>(lookup: &F, profile: &str, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = lookup(&prefixed) {
            return Some(v);
        }
    }
    lookup(key)
}

fn profiled_parse<F, T>(lookup: &F, profile: &str, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    profiled_opt(lookup, profile, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

// ── Loader config ─────────────────────────────────────────────

/// Tuning knobs for the font loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Active profile name (empty = default).
    #[serde(default)]
    pub profile: String,
    /// Maximum number of resolved typefaces kept in memory.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    /// Upper bound on background worker threads.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// How long an idle worker lingers before exiting.
    #[serde(default = "default_keep_alive_ms")]
    pub keep_alive_ms: u64,
    /// Timeout used by blocking loads when the caller does not pick one.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Prefix for worker thread names.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_cache_capacity() -> usize { 16 }
fn default_max_workers() -> usize { 1 }
fn default_keep_alive_ms() -> u64 { 10_000 }
fn default_timeout_ms() -> u64 { 500 }
fn default_thread_name() -> String { "fonts-worker".to_string() }

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            profile: String::new(),
            cache_capacity: default_cache_capacity(),
            max_workers: default_max_workers(),
            keep_alive_ms: default_keep_alive_ms(),
            default_timeout_ms: default_timeout_ms(),
            thread_name: default_thread_name(),
        }
    }
}

impl LoaderConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `FONTS_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_opt("FONTS_PROFILE").unwrap_or_default().to_uppercase();
        Self::from_lookup(&profile, env_opt)
    }

    /// Build config for a profile from an arbitrary key lookup.
    pub fn from_lookup<F>(profile: &str, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            cache_capacity: profiled_parse(&lookup, p, "FONTS_CACHE_CAPACITY", default_cache_capacity()),
            max_workers: profiled_parse(&lookup, p, "FONTS_MAX_WORKERS", default_max_workers()),
            keep_alive_ms: profiled_parse(&lookup, p, "FONTS_KEEP_ALIVE_MS", default_keep_alive_ms()),
            default_timeout_ms: profiled_parse(&lookup, p, "FONTS_TIMEOUT_MS", default_timeout_ms()),
            thread_name: profiled_opt(&lookup, p, "FONTS_THREAD_NAME").unwrap_or_else(default_thread_name),
        }
        .normalized()
    }

    /// Clamp values that would make the loader unusable.
    pub fn normalized(mut self) -> Self {
        self.cache_capacity = self.cache_capacity.max(1);
        self.max_workers = self.max_workers.max(1);
        if self.thread_name.is_empty() {
            self.thread_name = default_thread_name();
        }
        self
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Loader config (profile: {}):", self.profile_label());
        tracing::info!("  cache:   capacity={}", self.cache_capacity);
        tracing::info!(
            "  workers: max={}, keep_alive={}ms, name={}",
            self.max_workers,
            self.keep_alive_ms,
            self.thread_name
        );
        tracing::info!("  timeout: default={}ms", self.default_timeout_ms);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = LoaderConfig::from_lookup("", lookup(&[]));
        assert_eq!(config, LoaderConfig::default());
        assert_eq!(config.keep_alive(), Duration::from_secs(10));
        assert_eq!(config.profile_label(), "default");
    }

    #[test]
    fn profile_overrides_base_keys() {
        let config = LoaderConfig::from_lookup(
            "prod",
            lookup(&[
                ("FONTS_CACHE_CAPACITY", "32"),
                ("PROD_FONTS_CACHE_CAPACITY", "64"),
                ("FONTS_MAX_WORKERS", "4"),
            ]),
        );
        assert_eq!(config.profile, "PROD");
        assert_eq!(config.cache_capacity, 64);
        assert_eq!(config.max_workers, 4);
    }

    #[test]
    fn zero_and_garbage_values_are_sanitized() {
        let config = LoaderConfig::from_lookup(
            "",
            lookup(&[
                ("FONTS_CACHE_CAPACITY", "0"),
                ("FONTS_MAX_WORKERS", "0"),
                ("FONTS_TIMEOUT_MS", "soon"),
            ]),
        );
        assert_eq!(config.cache_capacity, 1);
        assert_eq!(config.max_workers, 1);
        assert_eq!(config.default_timeout_ms, 500);
    }

    #[test]
    fn deserializes_with_field_defaults() {
        let config: LoaderConfig = serde_json::from_str(r#"{"max_workers": 3}"#).unwrap();
        assert_eq!(config.max_workers, 3);
        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.thread_name, "fonts-worker");
    }
}

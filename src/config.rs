// src/config.rs
//! Process configuration, read once at orchestrator construction and
//! immutable thereafter: per-provider credentials from the environment plus
//! a JSON override file for fetch pacing, credibility priors, and deep-scan
//! thresholds. A missing or malformed file falls back to built-in defaults.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::credibility::CredibilityConfig;
use crate::fetch::FetchConfig;

pub const ENV_CONFIG_PATH: &str = "RESEARCH_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/research.json";

pub const ENV_SEARCH_KEY: &str = "SEARCH_API_KEY";
pub const ENV_CRAWL_KEY: &str = "CRAWL_API_KEY";
pub const ENV_COMMUNITY_KEY: &str = "COMMUNITY_API_KEY";
pub const ENV_VIDEO_KEY: &str = "VIDEO_API_KEY";
pub const ENV_STORIES_KEY: &str = "STORIES_API_KEY";

/// Per-provider credentials. Absence degrades that provider to stub mode, it
/// never fails the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub search: Option<String>,
    pub crawl: Option<String>,
    pub community: Option<String>,
    pub video: Option<String>,
    pub stories: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        fn non_empty(var: &str) -> Option<String> {
            std::env::var(var).ok().filter(|v| !v.trim().is_empty())
        }
        Self {
            search: non_empty(ENV_SEARCH_KEY),
            crawl: non_empty(ENV_CRAWL_KEY),
            community: non_empty(ENV_COMMUNITY_KEY),
            video: non_empty(ENV_VIDEO_KEY),
            stories: non_empty(ENV_STORIES_KEY),
        }
    }
}

/// JSON override file shape. Every field is optional; omitted fields keep
/// their built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileOverrides {
    #[serde(default)]
    cache_ttl_secs: Option<u64>,
    #[serde(default)]
    fetch_pool_size: Option<usize>,
    #[serde(default)]
    min_interval_ms: Option<u64>,
    #[serde(default)]
    per_host_interval_ms: Option<u64>,
    #[serde(default)]
    fetch_timeout_secs: Option<u64>,
    #[serde(default)]
    max_queries: Option<usize>,
    #[serde(default)]
    deep_scan_min_credibility: Option<f64>,
    #[serde(default)]
    deep_scan_max_items: Option<usize>,
    #[serde(default)]
    credibility: Option<CredibilityConfig>,
}

#[derive(Debug, Clone)]
pub struct DeepScanConfig {
    pub min_credibility: f64,
    pub max_items: usize,
}

impl Default for DeepScanConfig {
    fn default() -> Self {
        Self {
            min_credibility: 0.5,
            max_items: 100,
        }
    }
}

/// Top-level configuration for the research pipeline.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    pub fetch: FetchConfig,
    pub credibility: CredibilityConfig,
    pub deep_scan: DeepScanConfig,
    pub credentials: Credentials,
    pub max_queries: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            credibility: CredibilityConfig::default_seed(),
            deep_scan: DeepScanConfig::default(),
            credentials: Credentials::default(),
            max_queries: 12,
        }
    }
}

impl ResearchConfig {
    /// Resolve using `$RESEARCH_CONFIG_PATH`, then `config/research.json`,
    /// then pure defaults; credentials always come from the environment.
    pub fn from_env() -> Self {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut cfg = match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_json_str(&content),
            Err(_) => Self::default(),
        };
        cfg.credentials = Credentials::from_env();
        cfg
    }

    /// Apply a JSON override document on top of defaults. Malformed JSON
    /// keeps the defaults (degrade, never fail).
    pub fn from_json_str(content: &str) -> Self {
        let overrides: FileOverrides = serde_json::from_str(content).unwrap_or_else(|e| {
            tracing::warn!(target: "research", error = %e, "malformed research config, using defaults");
            FileOverrides::default()
        });

        let mut cfg = Self::default();
        if let Some(s) = overrides.cache_ttl_secs {
            cfg.fetch.cache_ttl = Duration::from_secs(s);
        }
        if let Some(n) = overrides.fetch_pool_size {
            cfg.fetch.pool_size = n.max(1);
        }
        if let Some(ms) = overrides.min_interval_ms {
            cfg.fetch.min_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = overrides.per_host_interval_ms {
            cfg.fetch.per_host_interval = Duration::from_millis(ms);
        }
        if let Some(s) = overrides.fetch_timeout_secs {
            cfg.fetch.timeout = Duration::from_secs(s.max(1));
        }
        if let Some(n) = overrides.max_queries {
            cfg.max_queries = n.max(1);
        }
        if let Some(v) = overrides.deep_scan_min_credibility {
            cfg.deep_scan.min_credibility = v.clamp(0.0, 1.0);
        }
        if let Some(n) = overrides.deep_scan_max_items {
            cfg.deep_scan.max_items = n.max(1);
        }
        if let Some(c) = overrides.credibility {
            cfg.credibility = c;
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let json = r#"{
            "cache_ttl_secs": 120,
            "fetch_pool_size": 3,
            "deep_scan_min_credibility": 0.7,
            "credibility": { "default_prior": 0.42 }
        }"#;
        let cfg = ResearchConfig::from_json_str(json);
        assert_eq!(cfg.fetch.cache_ttl, Duration::from_secs(120));
        assert_eq!(cfg.fetch.pool_size, 3);
        assert!((cfg.deep_scan.min_credibility - 0.7).abs() < 1e-9);
        assert!((cfg.credibility.default_prior - 0.42).abs() < 1e-9);
        // Untouched fields keep defaults.
        assert_eq!(cfg.max_queries, 12);
    }

    #[test]
    fn malformed_json_degrades_to_defaults() {
        let cfg = ResearchConfig::from_json_str("{not json");
        assert_eq!(cfg.fetch.pool_size, FetchConfig::default().pool_size);
    }

    #[test]
    fn pool_size_floor_is_one() {
        let cfg = ResearchConfig::from_json_str(r#"{"fetch_pool_size": 0}"#);
        assert_eq!(cfg.fetch.pool_size, 1);
    }
}

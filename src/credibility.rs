// src/credibility.rs
//! # Credibility Model
//!
//! Maps a `(url, text, structured)` triple to a single trust score in
//! `[0.2, 0.95]`:
//!
//! - Domain priors: the best configured substring match against the URL.
//! - Author boosts: verified flag, large audience, credential keywords.
//! - Community boosts: per-signal weight when the max observed value
//!   (after normalizing "1.2k"/"3M" tokens) clears a fixed threshold.
//! - Recency: linear decay from the configured full-weight window down to a
//!   floor at one year, with a soft heuristic when no date parses.
//!
//! Loads from JSON config, falls back to a built-in seed. Pure and
//! deterministic given its config and inputs.

use chrono::{Datelike, NaiveDate, Utc};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

use crate::extract::parse_count;
use crate::structured::StructuredFields;

/// Subscriber/follower count above which an author counts as high-trust.
const LARGE_AUDIENCE_THRESHOLD: u64 = 100_000;

const ACADEMIC_KEYWORDS: &[&str] = &["phd", "ph.d", "professor", "researcher", "data scientist"];
const PRACTITIONER_KEYWORDS: &[&str] = &[
    "founder",
    "marketer",
    "growth coach",
    "growth consultant",
    "growth strategist",
    "social media manager",
];

/// Minimum normalized value each community signal must reach before its
/// configured weight applies.
fn signal_threshold(name: &str) -> u64 {
    match name {
        "upvotes" => 100,
        "claps" => 200,
        "likes" => 500,
        "comments" => 50,
        "subscribers" => 10_000,
        _ => u64::MAX,
    }
}

/// Configuration for the credibility model, loaded from JSON or defaults.
/// Immutable after orchestrator construction.
#[derive(Debug, Clone, Deserialize)]
pub struct CredibilityConfig {
    /// Base score when no domain prior matches.
    #[serde(default = "default_prior")]
    pub default_prior: f64,
    /// Domain-substring → base score.
    #[serde(default)]
    pub domain_priors: HashMap<String, f64>,
    /// Credential label → additive boost.
    #[serde(default)]
    pub author_priors: HashMap<String, f64>,
    /// Community signal name → additive weight.
    #[serde(default)]
    pub community_weights: HashMap<String, f64>,
    /// Content this fresh (days) keeps full recency weight.
    #[serde(default = "default_recency_full_days")]
    pub recency_full_days: i64,
    /// Recency weight floor reached at 365+ days.
    #[serde(default = "default_recency_min")]
    pub recency_min_at_1_year: f64,
}

fn default_prior() -> f64 {
    0.5
}
fn default_recency_full_days() -> i64 {
    30
}
fn default_recency_min() -> f64 {
    0.6
}

impl CredibilityConfig {
    /// Load configuration from a JSON file.
    /// Falls back to `default_seed()` on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|_| {
                tracing::warn!(target: "research", "malformed credibility config, using seed");
                Self::default_seed()
            }),
            Err(_) => Self::default_seed(),
        }
    }

    /// Built-in seed covering the content platforms and marketing blogs the
    /// adapters commonly hit.
    pub fn default_seed() -> Self {
        let mut domain_priors = HashMap::new();
        for (k, v) in [
            ("stackexchange.com", 0.75),
            ("medium.com", 0.70),
            ("substack.com", 0.65),
            ("reddit.com", 0.65),
            ("quora.com", 0.60),
            ("youtube.com", 0.60),
            ("later.com", 0.80),
            ("hootsuite.com", 0.80),
            ("buffer.com", 0.80),
            ("sproutsocial.com", 0.80),
            ("socialmediaexaminer.com", 0.75),
            ("hubspot.com", 0.75),
            ("indiehackers.com", 0.65),
        ] {
            domain_priors.insert(k.to_string(), v);
        }

        let mut author_priors = HashMap::new();
        for (k, v) in [
            ("verified", 0.10),
            ("large_audience", 0.08),
            ("academic", 0.07),
            ("practitioner", 0.05),
        ] {
            author_priors.insert(k.to_string(), v);
        }

        let mut community_weights = HashMap::new();
        for (k, v) in [
            ("upvotes", 0.05),
            ("claps", 0.04),
            ("likes", 0.04),
            ("comments", 0.03),
            ("subscribers", 0.05),
        ] {
            community_weights.insert(k.to_string(), v);
        }

        Self {
            default_prior: 0.5,
            domain_priors,
            author_priors,
            community_weights,
            recency_full_days: 30,
            recency_min_at_1_year: 0.6,
        }
    }

    fn author_boost(&self, label: &str) -> f64 {
        self.author_priors.get(label).copied().unwrap_or(0.0)
    }
}

impl Default for CredibilityConfig {
    fn default() -> Self {
        Self::default_seed()
    }
}

/// Pure scoring engine over an immutable config.
#[derive(Debug, Clone)]
pub struct CredibilityEngine {
    cfg: CredibilityConfig,
}

impl CredibilityEngine {
    pub fn new(cfg: CredibilityConfig) -> Self {
        Self { cfg }
    }

    /// Composite trust score, always in [0.2, 0.95].
    pub fn score(&self, url: &str, text: &str, structured: &StructuredFields) -> f64 {
        let base = self.domain_prior(url);
        let author = self.author_boost(text, structured);
        let community = self.community_boost(structured);
        let recency = self.recency_weight(text, structured);

        let raw = (base + author + community).clamp(0.2, 0.99) * recency;
        raw.clamp(0.2, 0.95)
    }

    /// Best matching domain prior; substring match against the URL.
    fn domain_prior(&self, url: &str) -> f64 {
        let u = url.to_ascii_lowercase();
        let mut best: Option<f64> = None;
        for (k, &v) in &self.cfg.domain_priors {
            if u.contains(k.as_str()) {
                best = Some(best.map_or(v, |b| b.max(v)));
            }
        }
        best.unwrap_or(self.cfg.default_prior)
    }

    fn author_boost(&self, text: &str, structured: &StructuredFields) -> f64 {
        let mut boost = 0.0;
        if structured.author_verified() {
            boost += self.cfg.author_boost("verified");
        }

        let max_subs = structured
            .subscriber_tokens()
            .iter()
            .map(|t| parse_count(t))
            .max()
            .unwrap_or(0);
        if max_subs >= LARGE_AUDIENCE_THRESHOLD {
            boost += self.cfg.author_boost("large_audience");
        }

        let creds = structured
            .author_credentials()
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| text.to_ascii_lowercase());
        if ACADEMIC_KEYWORDS.iter().any(|k| creds.contains(k)) {
            boost += self.cfg.author_boost("academic");
        }
        if PRACTITIONER_KEYWORDS.iter().any(|k| creds.contains(k)) {
            boost += self.cfg.author_boost("practitioner");
        }
        boost
    }

    /// Sum of configured weights for each signal whose max observed value
    /// clears its fixed threshold.
    fn community_boost(&self, structured: &StructuredFields) -> f64 {
        let mut max_by_signal: HashMap<&str, u64> = HashMap::new();
        let signals = structured.community_signals();
        for s in &signals {
            let v = parse_count(&s.value);
            let e = max_by_signal.entry(s.name.as_str()).or_insert(0);
            *e = (*e).max(v);
        }

        let mut boost = 0.0;
        for (name, max) in &max_by_signal {
            if *max >= signal_threshold(name) {
                if let Some(w) = self.cfg.community_weights.get(*name) {
                    boost += w;
                }
            }
        }
        boost
    }

    /// Linear decay if a publish date parses; otherwise a soft year-mention
    /// heuristic (1.0 for current/prior year, neutral 0.85 otherwise).
    fn recency_weight(&self, text: &str, structured: &StructuredFields) -> f64 {
        let today = Utc::now().date_naive();
        if let Some(date) = structured.publish_date().and_then(parse_publish_date) {
            let age_days = (today - date).num_days().max(0);
            return self.decay(age_days);
        }

        let this_year = today.year();
        if text.contains(&this_year.to_string()) || text.contains(&(this_year - 1).to_string()) {
            1.0
        } else {
            0.85
        }
    }

    fn decay(&self, age_days: i64) -> f64 {
        let full = self.cfg.recency_full_days;
        let floor = self.cfg.recency_min_at_1_year;
        if age_days <= full {
            1.0
        } else if age_days >= 365 {
            floor
        } else {
            let span = (365 - full).max(1) as f64;
            1.0 - (age_days - full) as f64 / span * (1.0 - floor)
        }
    }
}

/// Parse the date formats the extractors emit.
fn parse_publish_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim().replace('.', "");
    for fmt in ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%B %d %Y", "%b %d %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(&s, fmt) {
            return Some(d);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structured::{ArticleFields, VideoFields};

    fn engine() -> CredibilityEngine {
        CredibilityEngine::new(CredibilityConfig::default_seed())
    }

    #[test]
    fn score_stays_in_bounds() {
        let e = engine();
        let inputs = [
            ("https://later.com/blog/growth", "verified founder, 500k subscribers"),
            ("https://unknown.example/x", ""),
            ("https://medium.com/@a/post", "by A Professor, PhD researcher"),
        ];
        for (url, text) in inputs {
            let s = StructuredFields::extract(url, text);
            let score = e.score(url, text, &s);
            assert!((0.2..=0.95).contains(&score), "score {score} out of bounds");
        }
    }

    #[test]
    fn domain_prior_uses_best_substring_match() {
        let e = engine();
        let unknown = e.score("https://nowhere.example/a", "plain text", &StructuredFields::Unknown);
        let trusted = e.score(
            "https://later.com/blog/a",
            "plain text",
            &StructuredFields::Unknown,
        );
        assert!(trusted > unknown);
    }

    #[test]
    fn verified_author_boosts_score() {
        let e = engine();
        let base = StructuredFields::Article(ArticleFields::default());
        let verified = StructuredFields::Article(ArticleFields {
            author_verified: true,
            ..ArticleFields::default()
        });
        let url = "https://medium.com/@x/y";
        assert!(e.score(url, "", &verified) > e.score(url, "", &base));
    }

    #[test]
    fn large_audience_and_community_signals_boost() {
        let e = engine();
        let url = "https://youtube.com/watch?v=1";
        let quiet = StructuredFields::Video(VideoFields::default());
        let loud = StructuredFields::Video(VideoFields {
            subscribers: vec!["1.2M".into()],
            likes: vec!["45k".into()],
            comments: vec!["900".into()],
            ..VideoFields::default()
        });
        assert!(e.score(url, "", &loud) > e.score(url, "", &quiet));
    }

    #[test]
    fn recency_decay_is_linear_between_bounds() {
        let e = engine();
        assert_eq!(e.decay(10), 1.0);
        assert_eq!(e.decay(500), e.cfg.recency_min_at_1_year);
        let mid = e.decay(200);
        assert!(mid < 1.0 && mid > e.cfg.recency_min_at_1_year);
    }

    #[test]
    fn year_mention_heuristic_when_no_date() {
        let e = engine();
        let year = Utc::now().date_naive().year();
        let fresh = format!("strategies that worked in {year}");
        let w_fresh = e.recency_weight(&fresh, &StructuredFields::Unknown);
        let w_stale = e.recency_weight("strategies from a while ago", &StructuredFields::Unknown);
        assert_eq!(w_fresh, 1.0);
        assert_eq!(w_stale, 0.85);
    }

    #[test]
    fn publish_date_formats_parse() {
        assert!(parse_publish_date("2024-11-02").is_some());
        assert!(parse_publish_date("March 5, 2024").is_some());
        assert!(parse_publish_date("Mar 5 2024").is_some());
        assert!(parse_publish_date("sometime").is_none());
    }
}

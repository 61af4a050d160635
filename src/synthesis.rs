// src/synthesis.rs
//! # Synthesis Engine
//!
//! Clusters a flat insight list into six fixed themes via first-match keyword
//! classification, aggregates a per-theme confidence (member confidence
//! blended with a source-reliability prior, plus a source-diversity bonus),
//! and mines theme-level metric/timeline snippets. The classifier is a
//! pluggable strategy so it can be swapped without touching orchestration.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde_json::{json, Value};

use crate::insight::{Insight, Metadata, SynthesizedPattern};

/// Theme vocabulary, in classification order; first matching theme wins.
/// The final entry is the catch-all and must stay last.
const THEMES: &[(&str, &[&str])] = &[
    (
        "hashtag_strategy",
        &["hashtag", "#", "tag strategy", "tagging"],
    ),
    (
        "posting_timing",
        &["best time", "posting time", "when to post", "schedule", "timing"],
    ),
    (
        "engagement_tactics",
        &["engagement", "comments", "reply", "respond", "interact", "community"],
    ),
    (
        "content_formats",
        &["reel", "carousel", "short-form", "video", "stories", "format"],
    ),
    (
        "automation_limits",
        &["automation", "bot", "shadowban", "rate limit", "daily limit", "safety"],
    ),
    ("general_growth", &[]),
];

/// Fixed source-reliability table consulted by substring match against an
/// insight's source identifier and URL.
const SOURCE_RELIABILITY: &[(&str, f64)] = &[
    ("later.com", 0.80),
    ("hootsuite", 0.80),
    ("buffer", 0.80),
    ("stackexchange", 0.75),
    ("medium", 0.70),
    ("deep_crawl", 0.70),
    ("success_stories", 0.65),
    ("reddit", 0.60),
    ("community", 0.60),
    ("web_search", 0.60),
    ("quora", 0.55),
    ("youtube", 0.55),
    ("video", 0.55),
];

const DEFAULT_SOURCE_RELIABILITY: f64 = 0.55;
const MAX_EVIDENCE: usize = 8;

/// Strategy seam for theme assignment. Implementations must be deterministic.
pub trait ThemeClassifier: Send + Sync {
    /// Name of the single theme this text belongs to.
    fn classify(&self, text: &str) -> &'static str;
}

/// Default classifier: first-match keyword scan over the fixed vocabulary.
#[derive(Debug, Default)]
pub struct KeywordThemeClassifier;

impl ThemeClassifier for KeywordThemeClassifier {
    fn classify(&self, text: &str) -> &'static str {
        let lowered = text.to_ascii_lowercase();
        for (theme, keywords) in THEMES {
            if keywords.iter().any(|k| lowered.contains(k)) {
                return theme;
            }
        }
        // Catch-all: last entry has no keywords.
        THEMES[THEMES.len() - 1].0
    }
}

pub struct SynthesisEngine {
    classifier: Box<dyn ThemeClassifier>,
}

impl Default for SynthesisEngine {
    fn default() -> Self {
        Self::new(Box::new(KeywordThemeClassifier))
    }
}

impl SynthesisEngine {
    pub fn new(classifier: Box<dyn ThemeClassifier>) -> Self {
        Self { classifier }
    }

    /// Cluster insights into confidence-ranked themes. Error-flagged insights
    /// are never used as evidence; empty input yields an empty list.
    pub fn synthesize(&self, insights: &[Insight]) -> Vec<SynthesizedPattern> {
        let mut buckets: Vec<(&'static str, Vec<&Insight>)> =
            THEMES.iter().map(|(name, _)| (*name, Vec::new())).collect();

        for insight in insights.iter().filter(|i| !i.is_error()) {
            let theme = self.classifier.classify(&insight.text);
            if let Some((_, members)) = buckets.iter_mut().find(|(name, _)| *name == theme) {
                members.push(insight);
            }
        }

        let mut patterns: Vec<SynthesizedPattern> = buckets
            .into_iter()
            .filter(|(_, members)| !members.is_empty())
            .map(|(name, members)| {
                let confidence = aggregate_confidence(&members);
                let metadata = theme_metadata(&members);
                SynthesizedPattern {
                    pattern: name.to_string(),
                    evidence: members.iter().take(MAX_EVIDENCE).map(|i| (*i).clone()).collect(),
                    confidence,
                    metadata,
                }
            })
            .collect();

        patterns.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        patterns
    }
}

/// Per-member blend of own confidence (0.6) and source prior (0.4), averaged,
/// plus a diversity bonus of 0.03 per distinct source capped at 0.2; the
/// aggregate is capped at 0.95.
fn aggregate_confidence(members: &[&Insight]) -> f64 {
    let mut sum = 0.0;
    let mut sources = std::collections::HashSet::new();
    for m in members {
        sum += 0.6 * m.confidence + 0.4 * source_reliability(m);
        sources.insert(m.source.as_str());
    }
    let mean = sum / members.len() as f64;
    let diversity = (0.03 * sources.len() as f64).min(0.2);
    (mean + diversity).min(0.95)
}

fn source_reliability(insight: &Insight) -> f64 {
    let mut haystack = insight.source.to_ascii_lowercase();
    if let Some(url) = insight.url() {
        haystack.push(' ');
        haystack.push_str(&url.to_ascii_lowercase());
    }
    for (key, weight) in SOURCE_RELIABILITY {
        if haystack.contains(key) {
            return *weight;
        }
    }
    DEFAULT_SOURCE_RELIABILITY
}

/// Theme-level metadata: timeline mentions and percentage/metric snippets
/// collected from member text, bounded.
fn theme_metadata(members: &[&Insight]) -> Metadata {
    static RE_TIMELINE: OnceCell<Regex> = OnceCell::new();
    let re_timeline =
        RE_TIMELINE.get_or_init(|| Regex::new(r"(?i)\d{1,3}\s*(?:day|week|month)s?\b").unwrap());
    static RE_PERCENT: OnceCell<Regex> = OnceCell::new();
    let re_percent = RE_PERCENT
        .get_or_init(|| Regex::new(r"\d+(?:\.\d+)?\s*%\s*[a-z]{0,12}").unwrap());

    let mut timelines: Vec<String> = Vec::new();
    let mut metrics: Vec<String> = Vec::new();
    for m in members {
        for hit in re_timeline.find_iter(&m.text) {
            if timelines.len() >= 10 {
                break;
            }
            let s = hit.as_str().trim().to_string();
            if !timelines.contains(&s) {
                timelines.push(s);
            }
        }
        for hit in re_percent.find_iter(&m.text) {
            if metrics.len() >= 10 {
                break;
            }
            let s = hit.as_str().trim().to_string();
            if !metrics.contains(&s) {
                metrics.push(s);
            }
        }
    }

    let mut meta = Metadata::new();
    if !timelines.is_empty() {
        meta.insert("timelines".into(), json!(timelines));
    }
    if !metrics.is_empty() {
        meta.insert("metrics".into(), json!(metrics));
    }
    meta.insert("evidence_sources".into(), {
        let mut sources: Vec<&str> = members.iter().map(|m| m.source.as_str()).collect();
        sources.sort_unstable();
        sources.dedup();
        Value::from(sources.into_iter().map(String::from).collect::<Vec<_>>())
    });
    meta
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insight(source: &str, text: &str, conf: f64) -> Insight {
        Insight::new(source, text, conf)
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(SynthesisEngine::default().synthesize(&[]).is_empty());
    }

    #[test]
    fn first_matching_theme_wins() {
        let c = KeywordThemeClassifier;
        // "hashtag" appears before "engagement" in the theme order.
        assert_eq!(c.classify("hashtag engagement tricks"), "hashtag_strategy");
        assert_eq!(c.classify("reply to comments fast"), "engagement_tactics");
        assert_eq!(c.classify("nothing matches this"), "general_growth");
    }

    #[test]
    fn output_sorted_by_confidence_and_evidence_bounded() {
        let mut insights = Vec::new();
        for i in 0..12 {
            insights.push(insight(
                &format!("src{i}"),
                "use niche hashtag rotation",
                0.8,
            ));
        }
        insights.push(insight("low", "no matching keywords here", 0.3));

        let out = SynthesisEngine::default().synthesize(&insights);
        assert_eq!(out.len(), 2);
        for pair in out.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
        assert!(out.iter().all(|p| p.evidence.len() <= 8));
        assert_eq!(out[0].pattern, "hashtag_strategy");
    }

    #[test]
    fn error_insights_are_not_evidence() {
        let insights = vec![
            Insight::error("web_search", "fetch failed"),
            insight("community", "reply to comments quickly", 0.7),
        ];
        let out = SynthesisEngine::default().synthesize(&insights);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].evidence.len(), 1);
        assert_eq!(out[0].evidence[0].source, "community");
    }

    #[test]
    fn diversity_bonus_rewards_distinct_sources() {
        let same: Vec<Insight> = (0..3)
            .map(|_| insight("one_source", "posting time matters", 0.6))
            .collect();
        let varied: Vec<Insight> = (0..3)
            .map(|i| insight(&format!("s{i}"), "posting time matters", 0.6))
            .collect();
        let a = SynthesisEngine::default().synthesize(&same);
        let b = SynthesisEngine::default().synthesize(&varied);
        assert!(b[0].confidence > a[0].confidence);
    }

    #[test]
    fn confidence_capped_at_095() {
        let insights: Vec<Insight> = (0..20)
            .map(|i| insight(&format!("later.com-{i}"), "hashtag tips", 1.0))
            .collect();
        let out = SynthesisEngine::default().synthesize(&insights);
        assert!(out[0].confidence <= 0.95);
    }

    #[test]
    fn theme_metadata_collects_timelines_and_metrics() {
        let insights = vec![insight(
            "community",
            "hashtag rotation grew reach 40% engagement in 3 months",
            0.7,
        )];
        let out = SynthesisEngine::default().synthesize(&insights);
        let meta = &out[0].metadata;
        assert!(meta.contains_key("timelines"));
        assert!(meta.contains_key("metrics"));
    }
}

// src/deep_scan.rs
//! Deep-scan aggregation: a heavier, credibility-filtered report over a raw
//! item batch. Items below the credibility floor are excluded from every
//! statistic and ranking but still appear in the reported item list.
//!
//! Median here is nearest-rank (rank = ceil(n/2), the lower-middle element
//! for even-length input), with no interpolation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::extract::parse_count;
use crate::insight::Insight;

const MAX_SAMPLES: usize = 10;
const MAX_SAMPLE_SOURCES: usize = 5;

/// Fixed trending-strategy vocabulary: (label, keyword set).
const TRENDING_VOCAB: &[(&str, &[&str])] = &[
    ("short_form_video", &["reel", "short-form", "short form", "tiktok"]),
    ("hashtag_strategy", &["hashtag"]),
    ("giveaway", &["giveaway", "contest"]),
    ("user_generated_content", &["user-generated", "user generated", "ugc"]),
    ("collaboration", &["collab", "partnership", "shoutout"]),
    ("carousel_posts", &["carousel"]),
    ("posting_time", &["best time", "posting time", "schedule"]),
    ("stories", &["stories", "story"]),
    ("cross_promotion", &["cross-promot", "cross promot"]),
    ("search_optimization", &["seo", "search optimization", "keyword"]),
];

/// Fixed success-pattern vocabulary.
const SUCCESS_VOCAB: &[(&str, &[&str])] = &[
    ("case_study", &["case study", "case-study"]),
    ("playbook", &["playbook", "framework", "step-by-step", "step by step"]),
    ("data_driven", &["data-driven", "data driven", "analytics"]),
];

/// One raw item entering the deep scan: free text plus a metrics bag of raw
/// tokens and whatever structured fields the producer attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanItem {
    pub source: String,
    #[serde(default)]
    pub url: Option<String>,
    pub text: String,
    pub credibility: f64,
    /// Metric name → raw tokens (e.g. "followers" → ["1.2k", "85k"]).
    #[serde(default)]
    pub metrics: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub structured: serde_json::Map<String, Value>,
}

impl ScanItem {
    /// Bridge from the research pipeline: an insight's confidence becomes the
    /// item's credibility, and the mined metrics / structured fields recorded
    /// in its metadata carry over without hand-translation.
    pub fn from_insight(insight: &Insight) -> Self {
        let mut metrics = HashMap::new();
        if let Some(Value::Object(map)) = insight.metadata.get("metrics") {
            for (name, tokens) in map {
                if let Value::Array(arr) = tokens {
                    let tokens: Vec<String> = arr
                        .iter()
                        .map(|v| match v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect();
                    if !tokens.is_empty() {
                        metrics.insert(name.clone(), tokens);
                    }
                }
            }
        }
        let structured = match insight.metadata.get("structured") {
            Some(Value::Object(map)) => map.clone(),
            _ => serde_json::Map::new(),
        };

        Self {
            source: insight.source.clone(),
            url: insight.url().map(str::to_string),
            text: insight.text.clone(),
            credibility: insight.confidence,
            metrics,
            structured,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub max_followers: u64,
    pub median_followers: u64,
    pub avg_growth_rate_pct: f64,
    pub avg_engagement_rate_pct: f64,
    pub max_timeline_days: u64,
    pub common_timeline_days: u64,
    pub follower_samples: Vec<u64>,
    pub growth_rate_samples: Vec<f64>,
    pub engagement_rate_samples: Vec<f64>,
    pub timeline_samples: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedEntry {
    pub label: String,
    pub weight: f64,
    pub sample_sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub niche: String,
    /// Full (truncated-to-max) item list, including sub-threshold items.
    pub items: Vec<ScanItem>,
    pub metrics_summary: MetricsSummary,
    pub trending_strategies: Vec<RankedEntry>,
    pub success_patterns: Vec<RankedEntry>,
}

/// Aggregate a raw item batch into a scan report. `raw_items` is truncated to
/// `max_items`; only items with `credibility >= min_credibility` feed the
/// statistics and rankings.
pub fn aggregate(
    niche: &str,
    raw_items: Vec<ScanItem>,
    min_credibility: f64,
    max_items: usize,
) -> ScanReport {
    let mut items = raw_items;
    items.truncate(max_items);

    let valid: Vec<&ScanItem> = items
        .iter()
        .filter(|i| i.credibility >= min_credibility)
        .collect();

    tracing::debug!(
        target: "research",
        niche,
        total = items.len(),
        valid = valid.len(),
        "deep scan aggregate"
    );

    ScanReport {
        niche: niche.to_string(),
        metrics_summary: summarize_metrics(&valid),
        trending_strategies: rank_by_vocab(&valid, TRENDING_VOCAB),
        success_patterns: rank_by_vocab(&valid, SUCCESS_VOCAB),
        items,
    }
}

fn summarize_metrics(valid: &[&ScanItem]) -> MetricsSummary {
    let mut followers: Vec<u64> = Vec::new();
    let mut growth: Vec<f64> = Vec::new();
    let mut engagement: Vec<f64> = Vec::new();
    let mut timelines: Vec<u64> = Vec::new();

    for item in valid {
        for tok in item.metrics.get("followers").into_iter().flatten() {
            let v = parse_count(tok);
            if v > 0 {
                followers.push(v);
            }
        }
        for tok in item.metrics.get("growth_rates").into_iter().flatten() {
            if let Ok(v) = tok.trim().trim_end_matches('%').parse::<f64>() {
                growth.push(v);
            }
        }
        for tok in item.metrics.get("engagement_rates").into_iter().flatten() {
            if let Ok(v) = tok.trim().trim_end_matches('%').parse::<f64>() {
                engagement.push(v);
            }
        }
        for tok in item.metrics.get("timeline_days").into_iter().flatten() {
            if let Ok(v) = tok.trim().parse::<u64>() {
                if v > 0 {
                    timelines.push(v);
                }
            }
        }
    }

    followers.sort_unstable();
    timelines.sort_unstable();

    MetricsSummary {
        max_followers: followers.last().copied().unwrap_or(0),
        median_followers: nearest_rank_median(&followers),
        avg_growth_rate_pct: mean(&growth),
        avg_engagement_rate_pct: mean(&engagement),
        max_timeline_days: timelines.last().copied().unwrap_or(0),
        common_timeline_days: nearest_rank_median(&timelines),
        follower_samples: followers.iter().rev().take(MAX_SAMPLES).copied().collect(),
        growth_rate_samples: growth.iter().take(MAX_SAMPLES).copied().collect(),
        engagement_rate_samples: engagement.iter().take(MAX_SAMPLES).copied().collect(),
        timeline_samples: timelines.iter().take(MAX_SAMPLES).copied().collect(),
    }
}

/// Nearest-rank median over a sorted slice: rank ceil(n/2), so the
/// lower-middle element for even-length input. Empty input → 0.
fn nearest_rank_median(sorted: &[u64]) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    sorted[(sorted.len() - 1) / 2]
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Weighted keyword ranking: each valid item contributes its credibility
/// (clamped to [0.2, 1.0]) to every vocabulary entry its text or structured
/// fields mention. Only positive-weight entries are kept, ranked descending.
fn rank_by_vocab(valid: &[&ScanItem], vocab: &[(&str, &[&str])]) -> Vec<RankedEntry> {
    let mut out: Vec<RankedEntry> = Vec::new();

    for (label, keywords) in vocab {
        let mut weight = 0.0;
        let mut sample_sources: Vec<String> = Vec::new();
        for item in valid {
            if item_mentions(item, keywords) {
                weight += item.credibility.clamp(0.2, 1.0);
                if sample_sources.len() < MAX_SAMPLE_SOURCES {
                    let src = item.url.clone().unwrap_or_else(|| item.source.clone());
                    if !sample_sources.contains(&src) {
                        sample_sources.push(src);
                    }
                }
            }
        }
        if weight > 0.0 {
            out.push(RankedEntry {
                label: label.to_string(),
                weight,
                sample_sources,
            });
        }
    }

    out.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    out
}

fn item_mentions(item: &ScanItem, keywords: &[&str]) -> bool {
    let mut haystack = item.text.to_ascii_lowercase();
    for value in item.structured.values() {
        append_strings(&mut haystack, value);
    }
    keywords.iter().any(|k| haystack.contains(k))
}

/// Collect string leaves, descending into arrays (snippet and token lists).
fn append_strings(haystack: &mut String, value: &Value) {
    match value {
        Value::String(s) => {
            haystack.push(' ');
            haystack.push_str(&s.to_ascii_lowercase());
        }
        Value::Array(items) => {
            for v in items {
                append_strings(haystack, v);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(source: &str, text: &str, cred: f64) -> ScanItem {
        ScanItem {
            source: source.to_string(),
            url: Some(format!("https://example.test/{source}")),
            text: text.to_string(),
            credibility: cred,
            metrics: HashMap::new(),
            structured: serde_json::Map::new(),
        }
    }

    fn with_metrics(mut it: ScanItem, key: &str, tokens: &[&str]) -> ScanItem {
        it.metrics
            .insert(key.to_string(), tokens.iter().map(|s| s.to_string()).collect());
        it
    }

    #[test]
    fn median_is_nearest_rank_lower_middle() {
        assert_eq!(nearest_rank_median(&[]), 0);
        assert_eq!(nearest_rank_median(&[7]), 7);
        assert_eq!(nearest_rank_median(&[1, 2, 3, 4]), 2);
        assert_eq!(nearest_rank_median(&[1, 2, 3, 4, 5]), 3);
    }

    #[test]
    fn filter_excludes_items_from_stats_but_not_report() {
        let items = vec![
            with_metrics(item("a", "reels case study", 0.9), "followers", &["10k"]),
            with_metrics(item("b", "reels again", 0.8), "followers", &["50k"]),
            with_metrics(item("c", "low cred", 0.3), "followers", &["9M"]),
            item("d", "low cred too", 0.2),
            item("e", "also low", 0.5),
        ];
        let report = aggregate("fitness", items, 0.6, 100);

        assert_eq!(report.items.len(), 5);
        // Stats come from the two qualifying items only.
        assert_eq!(report.metrics_summary.max_followers, 50_000);
        assert_eq!(report.metrics_summary.median_followers, 10_000);
        let trending = &report.trending_strategies;
        assert_eq!(trending.len(), 1);
        assert_eq!(trending[0].label, "short_form_video");
        assert!((trending[0].weight - 1.7).abs() < 1e-9);
    }

    #[test]
    fn truncates_to_max_items() {
        let items: Vec<ScanItem> = (0..10).map(|i| item(&format!("s{i}"), "text", 0.9)).collect();
        let report = aggregate("niche", items, 0.5, 4);
        assert_eq!(report.items.len(), 4);
    }

    #[test]
    fn rankings_keep_positive_weights_only_and_sort_desc() {
        let items = vec![
            item("a", "our hashtag case study with analytics", 0.9),
            item("b", "hashtag experiment", 0.7),
            item("c", "a giveaway that flopped", 0.6),
        ];
        let report = aggregate("niche", items, 0.5, 100);

        let labels: Vec<&str> = report
            .trending_strategies
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        assert_eq!(labels, vec!["hashtag_strategy", "giveaway"]);
        for pair in report.trending_strategies.windows(2) {
            assert!(pair[0].weight >= pair[1].weight);
        }

        let success: Vec<&str> = report
            .success_patterns
            .iter()
            .map(|e| e.label.as_str())
            .collect();
        assert!(success.contains(&"case_study"));
        assert!(success.contains(&"data_driven"));
    }

    #[test]
    fn sample_sources_are_bounded() {
        let items: Vec<ScanItem> = (0..9)
            .map(|i| item(&format!("s{i}"), "hashtag tips", 0.8))
            .collect();
        let report = aggregate("niche", items, 0.5, 100);
        assert!(report.trending_strategies[0].sample_sources.len() <= MAX_SAMPLE_SOURCES);
    }

    #[test]
    fn structured_string_arrays_count_toward_rankings() {
        let mut it = item("a", "plain unrelated text", 0.9);
        it.structured.insert(
            "snippets".into(),
            serde_json::json!(["we ran a giveaway last month", "then a contest"]),
        );
        let report = aggregate("niche", vec![it], 0.5, 100);
        assert!(report
            .trending_strategies
            .iter()
            .any(|e| e.label == "giveaway"));
    }

    #[test]
    fn scan_items_build_from_insights() {
        let insight = Insight::new("deep_crawl", "case study of steady growth", 0.8)
            .with_meta("url", serde_json::json!("https://medium.com/@a/post"))
            .with_meta(
                "metrics",
                serde_json::json!({
                    "followers": ["85k", "2k"],
                    "timeline_days": [90],
                }),
            );

        let it = ScanItem::from_insight(&insight);
        assert_eq!(it.source, "deep_crawl");
        assert_eq!(it.url.as_deref(), Some("https://medium.com/@a/post"));
        assert!((it.credibility - 0.8).abs() < 1e-9);

        let report = aggregate("niche", vec![it], 0.5, 100);
        assert_eq!(report.metrics_summary.max_followers, 85_000);
        assert_eq!(report.metrics_summary.common_timeline_days, 90);
        assert!(report
            .success_patterns
            .iter()
            .any(|e| e.label == "case_study"));
    }

    #[test]
    fn rate_averages_use_simple_mean() {
        let items = vec![
            with_metrics(
                with_metrics(item("a", "growth", 0.9), "growth_rates", &["100", "200"]),
                "engagement_rates",
                &["4.0"],
            ),
            with_metrics(item("b", "growth", 0.8), "engagement_rates", &["6.0"]),
        ];
        let report = aggregate("niche", items, 0.5, 100);
        assert!((report.metrics_summary.avg_growth_rate_pct - 150.0).abs() < 1e-9);
        assert!((report.metrics_summary.avg_engagement_rate_pct - 5.0).abs() < 1e-9);
    }
}

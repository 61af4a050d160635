// src/providers/mod.rs
//! Provider adapters: one per external content source. Every adapter shares
//! the same per-query pipeline (fetch → extract text → mine metrics →
//! structured extraction → credibility score → one `Insight`), differing only
//! in target URL construction and stub content. A failed fetch becomes one
//! error-flagged insight; a missing credential degrades the whole adapter to
//! stub mode.

pub mod community;
pub mod deep_crawl;
pub mod success_story;
pub mod video;
pub mod web_search;

use async_trait::async_trait;
use futures::future::join_all;
use metrics::counter;
use serde_json::Value;
use std::sync::Arc;

use crate::credibility::CredibilityEngine;
use crate::extract::{mine_metrics, strip_markup};
use crate::fetch::Fetcher;
use crate::insight::Insight;
use crate::structured::StructuredFields;

pub use community::CommunityAdapter;
pub use deep_crawl::DeepCrawlAdapter;
pub use success_story::SuccessStoryAdapter;
pub use video::VideoAdapter;
pub use web_search::WebSearchAdapter;

/// Which research flavor an adapter provides; the orchestrator selects
/// adapters by these hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResearchKind {
    TrendSearch,
    DeepCrawl,
    CommunityScrape,
    VideoAnalysis,
    SuccessStories,
}

impl ResearchKind {
    /// Parse a caller-supplied hint string; unknown hints are ignored by the
    /// orchestrator.
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim().to_ascii_lowercase().as_str() {
            "trend-search" | "trend_search" | "search" => Some(Self::TrendSearch),
            "deep-crawl" | "deep_crawl" | "crawl" => Some(Self::DeepCrawl),
            "community-scrape" | "community_scrape" | "community" => Some(Self::CommunityScrape),
            "video-analysis" | "video_analysis" | "video" => Some(Self::VideoAnalysis),
            "success-stories" | "success_stories" | "stories" => Some(Self::SuccessStories),
            _ => None,
        }
    }
}

/// Shared handles every adapter needs.
#[derive(Clone)]
pub struct ProviderContext {
    pub fetcher: Arc<Fetcher>,
    pub credibility: Arc<CredibilityEngine>,
}

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &'static str;
    fn kind(&self) -> ResearchKind;
    /// Turn the query list into insights. An `Err` here is an internal
    /// adapter failure; the orchestrator converts it into a single degraded
    /// insight instead of aborting siblings.
    async fn research(&self, queries: &[String]) -> anyhow::Result<Vec<Insight>>;
}

/// Minimal query-string encoding for GET targets: spaces become `+`, and
/// anything outside the unreserved set is percent-encoded.
pub(crate) fn encode_query(q: &str) -> String {
    let mut out = String::with_capacity(q.len());
    for b in q.bytes() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => {
                use std::fmt::Write as _;
                let _ = write!(&mut out, "%{:02X}", b);
            }
        }
    }
    out
}

/// Run the shared per-query pipeline. Fetches are issued concurrently but the
/// output is in the caller's query order (`join_all` preserves input order).
/// `polite` routes through the robots-aware, per-host-paced fetch path.
pub(crate) async fn run_queries<F>(
    ctx: &ProviderContext,
    source: &'static str,
    queries: &[String],
    target_for: F,
    polite: bool,
) -> Vec<Insight>
where
    F: Fn(&str) -> String + Sync,
{
    let tasks = queries.iter().map(|query| {
        let url = target_for(query);
        let ctx = ctx.clone();
        async move {
            let fetched = if polite {
                ctx.fetcher.fetch_polite(&url, source).await
            } else {
                ctx.fetcher.fetch(&url, source).await.map(Some)
            };
            match fetched {
                Ok(Some(body)) => build_insight(&ctx, source, query, &url, &body),
                // Robots skip: not an error, zero insights for this fetch.
                Ok(None) => None,
                Err(e) => Some(
                    Insight::error(source, format!("fetch failed for \"{query}\": {e}"))
                        .with_meta("url", Value::String(url.clone()))
                        .with_meta("query", Value::String(query.clone())),
                ),
            }
        }
    });

    let insights: Vec<Insight> = join_all(tasks).await.into_iter().flatten().collect();
    counter!("research_provider_insights_total").increment(insights.len() as u64);
    insights
}

/// One insight per successful fetch. A payload with no extractable text
/// yields zero insights rather than aborting the adapter.
fn build_insight(
    ctx: &ProviderContext,
    source: &'static str,
    query: &str,
    url: &str,
    body: &str,
) -> Option<Insight> {
    let text = strip_markup(body);
    if text.is_empty() {
        return None;
    }

    let metrics = mine_metrics(&text);
    let structured = StructuredFields::extract(url, &text);
    let confidence = ctx.credibility.score(url, &text, &structured);

    let summary: String = text.chars().take(280).collect();
    let mut insight = Insight::new(source, format!("{query}: {summary}"), confidence)
        .with_meta("url", Value::String(url.to_string()))
        .with_meta("query", Value::String(query.to_string()));
    if !metrics.is_empty() {
        insight = insight.with_meta("metrics", metrics.to_value());
    }
    if !matches!(structured, StructuredFields::Unknown) {
        insight = insight.with_meta("structured", structured.to_value());
    }
    Some(insight)
}

/// Fixed stub set for credential-less degraded mode. Confidence sits in the
/// 0.4–0.55 band and every record is flagged.
pub(crate) fn stub_set(source: &'static str, lines: &[(&str, f64)]) -> Vec<Insight> {
    counter!("research_provider_stub_runs_total").increment(1);
    tracing::warn!(target: "research", provider = source, "no credential configured, stub mode");
    lines
        .iter()
        .map(|(text, conf)| Insight::stub(source, *text, *conf))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_parse_with_both_separators() {
        assert_eq!(ResearchKind::from_hint("trend-search"), Some(ResearchKind::TrendSearch));
        assert_eq!(ResearchKind::from_hint("DEEP_CRAWL"), Some(ResearchKind::DeepCrawl));
        assert_eq!(ResearchKind::from_hint("community"), Some(ResearchKind::CommunityScrape));
        assert_eq!(ResearchKind::from_hint("astrology"), None);
    }

    #[test]
    fn query_encoding_is_url_safe() {
        assert_eq!(encode_query("fitness tips 2025"), "fitness+tips+2025");
        assert_eq!(encode_query("a&b=c"), "a%26b%3Dc");
    }

    #[test]
    fn stub_set_is_flagged() {
        let stubs = stub_set("web_search", &[("a finding", 0.5), ("another", 0.45)]);
        assert_eq!(stubs.len(), 2);
        assert!(stubs.iter().all(|s| s.is_stub()));
        assert!(stubs.iter().all(|s| (0.4..=0.55).contains(&s.confidence)));
    }
}

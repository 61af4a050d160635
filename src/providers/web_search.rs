// src/providers/web_search.rs
//! Generic web-search adapter (trend-search flavor): one search-API call per
//! query against a SERP endpoint.

use async_trait::async_trait;

use super::{encode_query, run_queries, stub_set, ProviderAdapter, ProviderContext, ResearchKind};
use crate::insight::Insight;

const STUBS: &[(&str, f64)] = &[
    (
        "Accounts in this niche that post consistently 4-5 times per week report the steadiest follower growth.",
        0.5,
    ),
    (
        "Short-form video is the most commonly cited discovery driver across recent search results.",
        0.5,
    ),
    (
        "Niche-specific hashtags outperform broad ones for smaller accounts in most search summaries.",
        0.45,
    ),
];

pub struct WebSearchAdapter {
    ctx: ProviderContext,
    api_key: Option<String>,
}

impl WebSearchAdapter {
    pub fn new(ctx: ProviderContext, api_key: Option<String>) -> Self {
        Self { ctx, api_key }
    }
}

#[async_trait]
impl ProviderAdapter for WebSearchAdapter {
    fn name(&self) -> &'static str {
        "web_search"
    }

    fn kind(&self) -> ResearchKind {
        ResearchKind::TrendSearch
    }

    async fn research(&self, queries: &[String]) -> anyhow::Result<Vec<Insight>> {
        let Some(key) = self.api_key.clone() else {
            return Ok(stub_set(self.name(), STUBS));
        };
        let target = move |q: &str| {
            format!(
                "https://serpapi.com/search.json?engine=google&q={}&api_key={}",
                encode_query(q),
                key
            )
        };
        Ok(run_queries(&self.ctx, self.name(), queries, target, false).await)
    }
}

// src/providers/deep_crawl.rs
//! Deep-crawl adapter for long-form articles and blog case studies. This is
//! the generic web-crawl path, so it fetches politely: robots.txt is
//! consulted per host and a per-host minimum delay applies on top of the
//! global pacing.

use async_trait::async_trait;

use super::{encode_query, run_queries, stub_set, ProviderAdapter, ProviderContext, ResearchKind};
use crate::insight::Insight;

const STUBS: &[(&str, f64)] = &[
    (
        "Long-form case studies typically attribute growth to a single repeatable content format rather than many.",
        0.5,
    ),
    (
        "Blog writeups in this niche emphasize a 90-day consistency window before growth compounds.",
        0.45,
    ),
];

pub struct DeepCrawlAdapter {
    ctx: ProviderContext,
    api_key: Option<String>,
}

impl DeepCrawlAdapter {
    pub fn new(ctx: ProviderContext, api_key: Option<String>) -> Self {
        Self { ctx, api_key }
    }
}

#[async_trait]
impl ProviderAdapter for DeepCrawlAdapter {
    fn name(&self) -> &'static str {
        "deep_crawl"
    }

    fn kind(&self) -> ResearchKind {
        ResearchKind::DeepCrawl
    }

    async fn research(&self, queries: &[String]) -> anyhow::Result<Vec<Insight>> {
        if self.api_key.is_none() {
            return Ok(stub_set(self.name(), STUBS));
        }
        let target = |q: &str| format!("https://medium.com/search?q={}", encode_query(q));
        Ok(run_queries(&self.ctx, self.name(), queries, target, true).await)
    }
}

// src/providers/success_story.rs
//! Success-story aggregator: first-person growth writeups. Cheapest of the
//! adapters, so the orchestrator also uses it as the designated fallback when
//! every primary adapter comes back empty.

use async_trait::async_trait;

use super::{encode_query, run_queries, stub_set, ProviderAdapter, ProviderContext, ResearchKind};
use crate::insight::Insight;

const STUBS: &[(&str, f64)] = &[
    (
        "Published success stories in this niche cluster around documented, data-driven experiments.",
        0.5,
    ),
    (
        "Most founder writeups describe 3-6 months of consistent posting before meaningful traction.",
        0.45,
    ),
];

pub struct SuccessStoryAdapter {
    ctx: ProviderContext,
    api_key: Option<String>,
}

impl SuccessStoryAdapter {
    pub fn new(ctx: ProviderContext, api_key: Option<String>) -> Self {
        Self { ctx, api_key }
    }
}

#[async_trait]
impl ProviderAdapter for SuccessStoryAdapter {
    fn name(&self) -> &'static str {
        "success_stories"
    }

    fn kind(&self) -> ResearchKind {
        ResearchKind::SuccessStories
    }

    async fn research(&self, queries: &[String]) -> anyhow::Result<Vec<Insight>> {
        if self.api_key.is_none() {
            return Ok(stub_set(self.name(), STUBS));
        }
        let target = |q: &str| {
            format!(
                "https://www.indiehackers.com/search?q={}",
                encode_query(q)
            )
        };
        Ok(run_queries(&self.ctx, self.name(), queries, target, false).await)
    }
}

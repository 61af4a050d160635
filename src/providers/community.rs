// src/providers/community.rs
//! Community-forum adapter: top threads matching each query, with upvote and
//! comment counts feeding the community-validation boosts.

use async_trait::async_trait;

use super::{encode_query, run_queries, stub_set, ProviderAdapter, ProviderContext, ResearchKind};
use crate::insight::Insight;

const STUBS: &[(&str, f64)] = &[
    (
        "Forum consensus favors replying to every comment in the first hour after posting.",
        0.5,
    ),
    (
        "Highly upvoted threads warn against engagement pods and bought followers.",
        0.5,
    ),
    (
        "Community members repeatedly cite niche hashtag rotation as a low-effort win.",
        0.4,
    ),
];

pub struct CommunityAdapter {
    ctx: ProviderContext,
    api_key: Option<String>,
}

impl CommunityAdapter {
    pub fn new(ctx: ProviderContext, api_key: Option<String>) -> Self {
        Self { ctx, api_key }
    }
}

#[async_trait]
impl ProviderAdapter for CommunityAdapter {
    fn name(&self) -> &'static str {
        "community"
    }

    fn kind(&self) -> ResearchKind {
        ResearchKind::CommunityScrape
    }

    async fn research(&self, queries: &[String]) -> anyhow::Result<Vec<Insight>> {
        if self.api_key.is_none() {
            return Ok(stub_set(self.name(), STUBS));
        }
        let target = |q: &str| {
            format!(
                "https://www.reddit.com/search.json?q={}&sort=top&limit=10",
                encode_query(q)
            )
        };
        Ok(run_queries(&self.ctx, self.name(), queries, target, false).await)
    }
}

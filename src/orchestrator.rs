// src/orchestrator.rs
//! # Research Orchestrator
//!
//! Top of the pipeline: expands a niche/goal pair into a query set, fans the
//! queries out to the selected provider adapters concurrently, isolates any
//! adapter failure into a single degraded insight, falls back to the
//! success-story adapter when everything comes back empty, and hands the
//! combined batch to the synthesis engine.

use metrics::counter;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ResearchConfig;
use crate::credibility::CredibilityEngine;
use crate::fetch::{Fetcher, HttpTransport, ReqwestTransport};
use crate::insight::{Insight, ResearchReport};
use crate::providers::{
    CommunityAdapter, DeepCrawlAdapter, ProviderAdapter, ProviderContext, ResearchKind,
    SuccessStoryAdapter, VideoAdapter, WebSearchAdapter,
};
use crate::query;
use crate::synthesis::SynthesisEngine;

/// Research flavors run when the caller supplies no recognizable hints.
const DEFAULT_KINDS: &[ResearchKind] = &[
    ResearchKind::TrendSearch,
    ResearchKind::DeepCrawl,
    ResearchKind::CommunityScrape,
];

pub struct ResearchOrchestrator {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
    fallback: Arc<dyn ProviderAdapter>,
    synthesis: SynthesisEngine,
    max_queries: usize,
}

impl ResearchOrchestrator {
    /// Build the full adapter set over a real HTTP transport.
    pub fn new(cfg: ResearchConfig) -> anyhow::Result<Self> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Ok(Self::with_transport(cfg, transport))
    }

    /// Same wiring over a caller-supplied transport.
    pub fn with_transport(cfg: ResearchConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let ctx = ProviderContext {
            fetcher: Arc::new(Fetcher::new(transport, cfg.fetch.clone())),
            credibility: Arc::new(CredibilityEngine::new(cfg.credibility.clone())),
        };
        let creds = &cfg.credentials;

        let adapters: Vec<Arc<dyn ProviderAdapter>> = vec![
            Arc::new(WebSearchAdapter::new(ctx.clone(), creds.search.clone())),
            Arc::new(DeepCrawlAdapter::new(ctx.clone(), creds.crawl.clone())),
            Arc::new(CommunityAdapter::new(ctx.clone(), creds.community.clone())),
            Arc::new(VideoAdapter::new(ctx.clone(), creds.video.clone())),
        ];
        let fallback: Arc<dyn ProviderAdapter> =
            Arc::new(SuccessStoryAdapter::new(ctx, creds.stories.clone()));

        Self::from_parts(adapters, fallback, SynthesisEngine::default(), cfg.max_queries)
    }

    /// Assemble from pre-built parts. Used by tests to inject mock adapters.
    pub fn from_parts(
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        fallback: Arc<dyn ProviderAdapter>,
        synthesis: SynthesisEngine,
        max_queries: usize,
    ) -> Self {
        Self {
            adapters,
            fallback,
            synthesis,
            max_queries,
        }
    }

    /// Raw research pass: expanded queries fanned out to the adapters chosen
    /// by `research_types` hints (unknown hints are ignored; no recognizable
    /// hint selects the default trio). Adapter outputs are concatenated in
    /// adapter registration order; a failing adapter contributes exactly one
    /// degraded insight and never disturbs its siblings.
    pub async fn conduct_raw(
        &self,
        niche: &str,
        goal: &str,
        research_types: &[String],
    ) -> Vec<Insight> {
        counter!("research_runs_total").increment(1);

        let topic = format!("{niche} {goal}");
        let queries = query::expand(&[topic], niche, self.max_queries);
        let kinds = selected_kinds(research_types);

        info!(
            target: "research",
            niche,
            goal,
            queries = queries.len(),
            kinds = kinds.len(),
            "research run started"
        );

        let mut handles = Vec::new();
        for adapter in self
            .adapters
            .iter()
            .filter(|a| kinds.contains(&a.kind()))
        {
            let adapter = Arc::clone(adapter);
            let queries = queries.clone();
            handles.push((
                adapter.name(),
                tokio::spawn(async move { adapter.research(&queries).await }),
            ));
        }

        let mut combined: Vec<Insight> = Vec::new();
        for (name, handle) in handles {
            match handle.await {
                Ok(Ok(insights)) => combined.extend(insights),
                Ok(Err(e)) => {
                    counter!("research_adapter_failures_total").increment(1);
                    warn!(target: "research", provider = name, error = %e, "adapter failed");
                    combined.push(Insight::error(
                        "orchestrator",
                        format!("provider {name} failed: {e}"),
                    ));
                }
                Err(e) => {
                    counter!("research_adapter_failures_total").increment(1);
                    warn!(target: "research", provider = name, error = %e, "adapter task aborted");
                    combined.push(Insight::error(
                        "orchestrator",
                        format!("provider {name} aborted: {e}"),
                    ));
                }
            }
        }

        if combined.is_empty() {
            counter!("research_fallback_total").increment(1);
            warn!(target: "research", niche, "no adapter produced insights, running fallback");
            match self.fallback.research(&queries).await {
                Ok(insights) => combined = insights,
                Err(e) => combined.push(Insight::error(
                    "orchestrator",
                    format!("fallback {} failed: {e}", self.fallback.name()),
                )),
            }
        }

        combined
    }

    /// Full pipeline over the default research flavors: raw research plus
    /// synthesized patterns.
    pub async fn conduct_comprehensive(&self, niche: &str, goal: &str) -> ResearchReport {
        self.conduct_comprehensive_with(niche, goal, &[]).await
    }

    /// Full pipeline with explicit research-type hints.
    pub async fn conduct_comprehensive_with(
        &self,
        niche: &str,
        goal: &str,
        research_types: &[String],
    ) -> ResearchReport {
        let raw_insights = self.conduct_raw(niche, goal, research_types).await;
        let synthesized = self.synthesis.synthesize(&raw_insights);
        info!(
            target: "research",
            niche,
            raw = raw_insights.len(),
            patterns = synthesized.len(),
            "research run finished"
        );
        ResearchReport {
            raw_insights,
            synthesized,
        }
    }
}

fn selected_kinds(research_types: &[String]) -> Vec<ResearchKind> {
    let mut kinds: Vec<ResearchKind> = research_types
        .iter()
        .filter_map(|h| ResearchKind::from_hint(h))
        .collect();
    kinds.dedup();
    if kinds.is_empty() {
        kinds = DEFAULT_KINDS.to_vec();
    }
    kinds
}

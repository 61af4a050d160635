// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod credibility;
pub mod deep_scan;
pub mod extract;
pub mod fetch;
pub mod insight;
pub mod orchestrator;
pub mod query;
pub mod structured;
pub mod synthesis;

// Provider adapters (one module per external source)
pub mod providers;

// ---- Re-exports for stable public API ----
pub use crate::config::ResearchConfig;
pub use crate::deep_scan::{aggregate as deep_scan, ScanItem, ScanReport};
pub use crate::insight::{Insight, ResearchReport, SynthesizedPattern};
pub use crate::orchestrator::ResearchOrchestrator;
pub use crate::synthesis::SynthesisEngine;

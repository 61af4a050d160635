// src/insight.rs
//! Core value types flowing through the pipeline: one atomic `Insight` per
//! fetched piece of content, plus the synthesized and comprehensive result
//! shapes handed back to the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open key/value bag attached to every insight (url, metrics, structured
/// fields, error/stub flags).
pub type Metadata = Map<String, Value>;

/// One atomic finding from a provider. Immutable once built; `confidence` is
/// always clamped to [0.0, 1.0].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub source: String,
    pub text: String,
    pub confidence: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Insight {
    pub fn new(source: impl Into<String>, text: impl Into<String>, confidence: f64) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            metadata: Metadata::new(),
        }
    }

    /// Degraded insight for a failed fetch. Error insights never carry
    /// confidence above 0.3 and are flagged so downstream stages can ignore
    /// them as positive evidence.
    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        let mut ins = Self::new(source, message, 0.2);
        ins.metadata.insert("error".into(), Value::Bool(true));
        ins
    }

    /// Stub insight emitted when a provider has no credential configured.
    pub fn stub(source: impl Into<String>, text: impl Into<String>, confidence: f64) -> Self {
        let mut ins = Self::new(source, text, confidence.clamp(0.4, 0.55));
        ins.metadata.insert("stub".into(), Value::Bool(true));
        ins
    }

    pub fn with_meta(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn is_error(&self) -> bool {
        self.metadata.get("error").and_then(Value::as_bool) == Some(true)
    }

    pub fn is_stub(&self) -> bool {
        self.metadata.get("stub").and_then(Value::as_bool) == Some(true)
    }

    /// `metadata.url` if the adapter recorded one.
    pub fn url(&self) -> Option<&str> {
        self.metadata.get("url").and_then(Value::as_str)
    }
}

/// A named cluster of insights sharing a keyword-detected topic. Produced
/// fresh on every synthesis call; consumers receive a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizedPattern {
    pub pattern: String,
    /// Up to 8 supporting insights.
    pub evidence: Vec<Insight>,
    pub confidence: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Comprehensive research result: the flat insight list plus the ranked,
/// thematically clustered view of the same data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    pub raw_insights: Vec<Insight>,
    pub synthesized: Vec<SynthesizedPattern>,
}

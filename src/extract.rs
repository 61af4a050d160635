// src/extract.rs
//! Shared text extraction: markup stripping, numeric-token normalization
//! ("1.2k" → 1200), and generic metric mining (followers, engagement %,
//! growth %, day/week/month timelines) used by every provider adapter.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Extract plain text from fetched markup: drop script/style blocks, strip
/// tags, decode HTML entities, collapse whitespace. Output is capped so one
/// oversized page cannot balloon downstream processing.
pub fn strip_markup(s: &str) -> String {
    static RE_BLOCKS: OnceCell<Regex> = OnceCell::new();
    let re_blocks = RE_BLOCKS.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)>").unwrap()
    });
    let mut out = re_blocks.replace_all(s, " ").to_string();

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = html_escape::decode_html_entities(&out).to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Length cap: 20k chars
    if out.chars().count() > 20_000 {
        out = out.chars().take(20_000).collect();
    }
    out
}

/// Normalize a count token with an optional k/m suffix into a plain number.
/// `"1.2k"` → 1200, `"3M"` → 3_000_000, `"450"` → 450. Unparseable → 0.
pub fn parse_count(token: &str) -> u64 {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)^\s*([\d][\d,]*(?:\.\d+)?)\s*([km])?\s*$").unwrap());
    let Some(caps) = re.captures(token) else {
        return 0;
    };
    let num: f64 = caps[1].replace(',', "").parse().unwrap_or(0.0);
    let mult = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(s) if s == "k" => 1_000.0,
        Some(s) if s == "m" => 1_000_000.0,
        _ => 1.0,
    };
    (num * mult).round() as u64
}

/// Generic metrics mined from free text via pattern matching. Raw tokens are
/// kept as strings; consumers normalize with [`parse_count`] where needed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MinedMetrics {
    pub followers: Vec<String>,
    pub engagement_rates: Vec<String>,
    pub growth_rates: Vec<String>,
    pub timeline_days: Vec<u64>,
}

impl MinedMetrics {
    pub fn is_empty(&self) -> bool {
        self.followers.is_empty()
            && self.engagement_rates.is_empty()
            && self.growth_rates.is_empty()
            && self.timeline_days.is_empty()
    }

    /// Metadata-shaped view for attaching to an `Insight`.
    pub fn to_value(&self) -> Value {
        json!({
            "followers": self.followers,
            "engagement_rates": self.engagement_rates,
            "growth_rates": self.growth_rates,
            "timeline_days": self.timeline_days,
        })
    }
}

/// Mine follower counts, engagement-rate percentages, growth percentages and
/// day/week/month timelines from plain text. Bounded: at most 10 hits per
/// category.
pub fn mine_metrics(text: &str) -> MinedMetrics {
    const MAX_HITS: usize = 10;
    let mut m = MinedMetrics::default();

    static RE_FOLLOWERS: OnceCell<Regex> = OnceCell::new();
    let re_followers = RE_FOLLOWERS
        .get_or_init(|| Regex::new(r"(?i)([\d][\d,]*(?:\.\d+)?\s*[km]?)\+?\s*followers").unwrap());
    for caps in re_followers.captures_iter(text).take(MAX_HITS) {
        m.followers.push(caps[1].trim().to_string());
    }

    static RE_ENGAGEMENT: OnceCell<Regex> = OnceCell::new();
    let re_engagement = RE_ENGAGEMENT
        .get_or_init(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*%\s*engagement").unwrap());
    for caps in re_engagement.captures_iter(text).take(MAX_HITS) {
        m.engagement_rates.push(caps[1].to_string());
    }

    static RE_GROWTH: OnceCell<Regex> = OnceCell::new();
    let re_growth = RE_GROWTH.get_or_init(|| {
        Regex::new(r"(?i)(?:grew|growth(?:\s+of)?|increased?(?:\s+by)?)\s+(\d+(?:\.\d+)?)\s*%|(\d+(?:\.\d+)?)\s*%\s*growth")
            .unwrap()
    });
    for caps in re_growth.captures_iter(text).take(MAX_HITS) {
        if let Some(g) = caps.get(1).or_else(|| caps.get(2)) {
            m.growth_rates.push(g.as_str().to_string());
        }
    }

    static RE_TIMELINE: OnceCell<Regex> = OnceCell::new();
    let re_timeline =
        RE_TIMELINE.get_or_init(|| Regex::new(r"(?i)(\d{1,3})\s*(day|week|month)s?\b").unwrap());
    for caps in re_timeline.captures_iter(text).take(MAX_HITS) {
        let n: u64 = caps[1].parse().unwrap_or(0);
        let days = match caps[2].to_ascii_lowercase().as_str() {
            "week" => n * 7,
            "month" => n * 30,
            _ => n,
        };
        if days > 0 {
            m.timeline_days.push(days);
        }
    }

    m
}

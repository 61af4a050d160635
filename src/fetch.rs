// src/fetch.rs
//! Cached, rate-limited fetch primitive shared by every provider adapter.
//!
//! - TTL cache keyed by a stable signature of (target, options); a live hit
//!   skips rate limiting entirely, expired entries are deleted on read.
//! - Bounded concurrency via a semaphore pool.
//! - Process-wide minimum inter-call spacing (reserve-then-sleep on a
//!   mutex-guarded timestamp, safe under real parallel tasks).
//! - Typed errors so callers convert failures into degraded insights instead
//!   of aborting the batch. Nothing is written to the cache on failure.
//! - A polite variant for page crawling: robots.txt consultation plus a
//!   distinct per-host minimum delay.

use async_trait::async_trait;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Fetch failure taxonomy. Always recovered locally by adapters; never
/// propagated past the adapter boundary as a panic.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected status {0}")]
    Status(u16),
}

pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Seam between the fetcher and the network so tests can inject stub
/// transports and count real calls.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<TransportResponse, FetchError>;
}

/// Production transport over reqwest (rustls).
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("niche-research-engine/0.1")
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<TransportResponse, FetchError> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(timeout)
                } else {
                    FetchError::Transport(e.to_string())
                }
            })?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(TransportResponse { status, body })
    }
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub cache_ttl: Duration,
    pub pool_size: usize,
    /// Process-wide minimum spacing between network calls.
    pub min_interval: Duration,
    /// Additional per-host spacing for the polite crawl path.
    pub per_host_interval: Duration,
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(900),
            pool_size: 5,
            min_interval: Duration::from_millis(500),
            per_host_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(10),
        }
    }
}

struct CacheEntry {
    expires_at: Instant,
    payload: String,
}

/// One-time metrics registration (so series show up on the exporter the
/// embedding service wires up).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("research_cache_hits_total", "Fetch cache hits.");
        describe_counter!("research_cache_misses_total", "Fetch cache misses.");
        describe_counter!("research_network_calls_total", "Network calls issued.");
        describe_counter!("research_fetch_errors_total", "Failed network calls.");
        describe_counter!("research_robots_skips_total", "URLs skipped per robots.txt.");
        describe_histogram!("research_fetch_ms", "Network call latency in milliseconds.");
    });
}

/// Process-wide cached, paced fetch primitive. Shared across all adapters via
/// `Arc`; cache entries are immutable once written.
pub struct Fetcher {
    transport: std::sync::Arc<dyn HttpTransport>,
    cfg: FetchConfig,
    cache: Mutex<HashMap<String, CacheEntry>>,
    pool: Semaphore,
    last_call: Mutex<Option<Instant>>,
    host_last: Mutex<HashMap<String, Instant>>,
    robots: tokio::sync::Mutex<HashMap<String, Vec<String>>>,
}

impl Fetcher {
    pub fn new(transport: std::sync::Arc<dyn HttpTransport>, cfg: FetchConfig) -> Self {
        ensure_metrics_described();
        let pool_size = cfg.pool_size.max(1);
        Self {
            transport,
            cfg,
            cache: Mutex::new(HashMap::new()),
            pool: Semaphore::new(pool_size),
            last_call: Mutex::new(None),
            host_last: Mutex::new(HashMap::new()),
            robots: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Stable signature of (target, options).
    fn cache_key(target: &str, options: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(target.as_bytes());
        hasher.update([0u8]);
        hasher.update(options.as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(32);
        for b in digest.iter().take(16) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }

    /// Live cache lookup; expired entries are deleted on read, so a miss is
    /// indistinguishable from a never-fetched key.
    fn cache_get(&self, key: &str) -> Option<String> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        match cache.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.payload.clone()),
            Some(_) => {
                cache.remove(key);
                None
            }
            None => None,
        }
    }

    fn cache_put(&self, key: String, payload: String) {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(
            key,
            CacheEntry {
                expires_at: Instant::now() + self.cfg.cache_ttl,
                payload,
            },
        );
    }

    /// Drop every expired entry. The read path already deletes lazily; this
    /// sweep keeps a long-lived process from accumulating dead keys.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.retain(|_, e| e.expires_at > now);
    }

    #[cfg(test)]
    fn cache_len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Reserve the next allowed call slot and return how long to wait for it.
    /// The timestamp is read-then-written under one lock so parallel tasks
    /// each get a distinct slot.
    fn reserve_slot(&self) -> Duration {
        let mut last = self.last_call.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let next = match *last {
            Some(prev) => (prev + self.cfg.min_interval).max(now),
            None => now,
        };
        *last = Some(next);
        next.saturating_duration_since(now)
    }

    fn reserve_host_slot(&self, host: &str) -> Duration {
        let mut map = self.host_last.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let next = match map.get(host) {
            Some(&prev) => (prev + self.cfg.per_host_interval).max(now),
            None => now,
        };
        map.insert(host.to_string(), next);
        next.saturating_duration_since(now)
    }

    /// Fetch `target`: cached payload on a live hit, otherwise a paced,
    /// bounded, timed network call. Failures return a typed error and leave
    /// the cache untouched.
    pub async fn fetch(&self, target: &str, options: &str) -> Result<String, FetchError> {
        let key = Self::cache_key(target, options);
        if let Some(hit) = self.cache_get(&key) {
            counter!("research_cache_hits_total").increment(1);
            return Ok(hit);
        }
        counter!("research_cache_misses_total").increment(1);

        let _permit = self
            .pool
            .acquire()
            .await
            .map_err(|e| FetchError::Transport(format!("fetch pool closed: {e}")))?;

        let wait = self.reserve_slot();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        counter!("research_network_calls_total").increment(1);
        let t0 = Instant::now();
        let result = self.transport.get(target, self.cfg.timeout).await;
        histogram!("research_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        match result {
            Ok(resp) if (200..300).contains(&resp.status) => {
                self.cache_put(key, resp.body.clone());
                Ok(resp.body)
            }
            Ok(resp) => {
                counter!("research_fetch_errors_total").increment(1);
                Err(FetchError::Status(resp.status))
            }
            Err(e) => {
                counter!("research_fetch_errors_total").increment(1);
                warn!(target: "research", error = %e, url = target, "fetch failed");
                Err(e)
            }
        }
    }

    /// Polite crawl fetch: consult the host's robots.txt (a disallowed URL is
    /// a skip, `Ok(None)`, not an error) and enforce the per-host delay on
    /// top of the global pacing.
    pub async fn fetch_polite(&self, url: &str, options: &str) -> Result<Option<String>, FetchError> {
        let key = Self::cache_key(url, options);
        if let Some(hit) = self.cache_get(&key) {
            counter!("research_cache_hits_total").increment(1);
            return Ok(Some(hit));
        }

        if self.robots_disallows(url).await {
            counter!("research_robots_skips_total").increment(1);
            debug!(target: "research", url, "skipped by robots.txt");
            return Ok(None);
        }

        if let Some(host) = host_of(url) {
            let wait = self.reserve_host_slot(&host);
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }

        self.fetch(url, options).await.map(Some)
    }

    /// True when the host's robots.txt disallows the URL's path for `*`.
    /// A missing or unreadable robots.txt allows everything.
    async fn robots_disallows(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };
        let path = path_of(url);

        let mut robots = self.robots.lock().await;
        if !robots.contains_key(&host) {
            let robots_url = format!("https://{host}/robots.txt");
            let rules = match self.fetch(&robots_url, "robots").await {
                Ok(body) => parse_robots(&body),
                Err(_) => Vec::new(),
            };
            robots.insert(host.clone(), rules);
        }
        let rules = robots.get(&host).map(Vec::as_slice).unwrap_or(&[]);
        rules.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Disallow prefixes for the `*` user-agent.
fn parse_robots(body: &str) -> Vec<String> {
    let mut rules = Vec::new();
    let mut applies = false;
    for raw in body.lines() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match field.trim().to_ascii_lowercase().as_str() {
            "user-agent" => applies = value == "*",
            "disallow" if applies && !value.is_empty() => rules.push(value.to_string()),
            _ => {}
        }
    }
    rules
}

fn host_of(url: &str) -> Option<String> {
    let rest = url.split("://").nth(1)?;
    let host = rest.split(['/', '?']).next()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_ascii_lowercase())
    }
}

fn path_of(url: &str) -> String {
    let Some(rest) = url.split("://").nth(1) else {
        return "/".to_string();
    };
    match rest.find('/') {
        Some(i) => rest[i..].to_string(),
        None => "/".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StaticTransport {
        calls: AtomicUsize,
        status: u16,
        body: String,
    }

    impl StaticTransport {
        fn ok(body: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                status: 200,
                body: body.to_string(),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for StaticTransport {
        async fn get(&self, _url: &str, _t: Duration) -> Result<TransportResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TransportResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    fn quick_cfg() -> FetchConfig {
        FetchConfig {
            cache_ttl: Duration::from_secs(60),
            pool_size: 2,
            min_interval: Duration::ZERO,
            per_host_interval: Duration::ZERO,
            timeout: Duration::from_secs(1),
        }
    }

    /// Transport that timestamps every call on the tokio clock.
    #[derive(Default)]
    struct RecordingTransport {
        calls: Mutex<Vec<(String, tokio::time::Instant)>>,
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn get(&self, url: &str, _t: Duration) -> Result<TransportResponse, FetchError> {
            self.calls
                .lock()
                .unwrap()
                .push((url.to_string(), tokio::time::Instant::now()));
            Ok(TransportResponse {
                status: 200,
                body: "ok".to_string(),
            })
        }
    }

    #[test]
    fn cache_key_is_stable_and_distinguishes_options() {
        let a = Fetcher::cache_key("https://x.test/a", "");
        let b = Fetcher::cache_key("https://x.test/a", "");
        let c = Fetcher::cache_key("https://x.test/a", "page=2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn error_fetch_writes_nothing_to_cache() {
        let transport = Arc::new(StaticTransport {
            calls: AtomicUsize::new(0),
            status: 503,
            body: String::new(),
        });
        let fetcher = Fetcher::new(transport, quick_cfg());
        let err = fetcher.fetch("https://x.test/a", "").await.unwrap_err();
        assert!(matches!(err, FetchError::Status(503)));
        assert_eq!(fetcher.cache_len(), 0);
    }

    #[tokio::test]
    async fn expired_entries_are_deleted_on_read() {
        let transport = Arc::new(StaticTransport::ok("payload"));
        let mut cfg = quick_cfg();
        cfg.cache_ttl = Duration::ZERO;
        let fetcher = Fetcher::new(transport.clone(), cfg);

        fetcher.fetch("https://x.test/a", "").await.unwrap();
        // TTL of zero: the entry is already expired on the next read.
        fetcher.fetch("https://x.test/a", "").await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn min_interval_spaces_network_calls() {
        let transport = Arc::new(RecordingTransport::default());
        let mut cfg = quick_cfg();
        cfg.min_interval = Duration::from_millis(500);
        let fetcher = Fetcher::new(transport.clone(), cfg);

        fetcher.fetch("https://x.test/a", "").await.unwrap();
        fetcher.fetch("https://x.test/b", "").await.unwrap();

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let gap = calls[1].1 - calls[0].1;
        // Slack for the real-time instants taken while reserving the slot.
        assert!(gap >= Duration::from_millis(450), "calls only {gap:?} apart");
    }

    #[tokio::test(start_paused = true)]
    async fn polite_path_enforces_per_host_delay() {
        let transport = Arc::new(RecordingTransport::default());
        let mut cfg = quick_cfg();
        cfg.per_host_interval = Duration::from_secs(2);
        let fetcher = Fetcher::new(transport.clone(), cfg);

        fetcher.fetch_polite("https://x.test/a", "").await.unwrap();
        fetcher.fetch_polite("https://x.test/b", "").await.unwrap();

        let calls = transport.calls.lock().unwrap();
        let pages: Vec<_> = calls
            .iter()
            .filter(|(url, _)| !url.ends_with("/robots.txt"))
            .collect();
        assert_eq!(pages.len(), 2);
        let gap = pages[1].1 - pages[0].1;
        assert!(gap >= Duration::from_millis(1_900), "pages only {gap:?} apart");
    }

    #[test]
    fn robots_parser_scopes_to_star_agent() {
        let body = "User-agent: googlebot\nDisallow: /private\n\n\
                    User-agent: *\nDisallow: /search\nDisallow: /admin # note\n";
        let rules = parse_robots(body);
        assert_eq!(rules, vec!["/search".to_string(), "/admin".to_string()]);
    }

    #[test]
    fn host_and_path_split() {
        assert_eq!(host_of("https://Example.com/a/b?q=1"), Some("example.com".into()));
        assert_eq!(path_of("https://example.com/a/b?q=1"), "/a/b?q=1");
        assert_eq!(path_of("https://example.com"), "/");
        assert_eq!(host_of("not a url"), None);
    }

    #[tokio::test]
    async fn robots_disallow_skips_without_error() {
        struct RobotsTransport;
        #[async_trait]
        impl HttpTransport for RobotsTransport {
            async fn get(&self, url: &str, _t: Duration) -> Result<TransportResponse, FetchError> {
                let body = if url.ends_with("/robots.txt") {
                    "User-agent: *\nDisallow: /blocked\n".to_string()
                } else {
                    "page body".to_string()
                };
                Ok(TransportResponse { status: 200, body })
            }
        }

        let fetcher = Fetcher::new(Arc::new(RobotsTransport), quick_cfg());
        let skipped = fetcher
            .fetch_polite("https://x.test/blocked/page", "")
            .await
            .unwrap();
        assert!(skipped.is_none());

        let allowed = fetcher.fetch_polite("https://x.test/open", "").await.unwrap();
        assert_eq!(allowed.as_deref(), Some("page body"));
    }
}

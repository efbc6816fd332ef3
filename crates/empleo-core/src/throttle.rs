//! Per-domain request throttling for polite fetching.
//!
//! Wraps any [`PageFetcher`] so that every session opened through it shares
//! one per-domain clock. Bumeran detail pages all live on the same host, so
//! without this a single search fires dozens of requests at it in a burst.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use empleo_core::{PageFetcher, ThrottleConfig, ThrottledFetcher};
//!
//! fn polite<F: PageFetcher>(inner: F) -> ThrottledFetcher<F> {
//!     let config = ThrottleConfig::new(Duration::from_secs(1))
//!         .with_jitter(Duration::from_millis(500));
//!     ThrottledFetcher::new(inner, config)
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use url::Url;

use crate::error::AppError;
use crate::traits::{PageFetcher, PageSession};

/// Configuration for the throttled fetcher.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Minimum delay between consecutive requests to the same domain.
    pub delay: Duration,

    /// Maximum random jitter added on top of `delay` (uniform [0, jitter]).
    ///
    /// Set to `Duration::ZERO` to disable.
    pub jitter: Duration,
}

impl ThrottleConfig {
    /// Create a new config with the given per-domain delay and no jitter.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            jitter: Duration::ZERO,
        }
    }

    /// Add random jitter (uniform [0, jitter]) on top of the base delay.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Compute the effective delay for a single wait (delay + random jitter).
    fn effective_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let jitter_ms = rand_jitter_ms(self.jitter.as_millis() as u64);
        self.delay + Duration::from_millis(jitter_ms)
    }
}

impl Default for ThrottleConfig {
    /// 1 second delay, 500ms jitter.
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(1),
            jitter: Duration::from_millis(500),
        }
    }
}

/// Last request time per domain, shared by all sessions of one fetcher.
#[derive(Clone)]
struct DomainClock {
    config: ThrottleConfig,
    last_request: Arc<Mutex<HashMap<String, Instant>>>,
}

impl DomainClock {
    /// Extract the domain key from a URL (scheme://host:port).
    fn domain_key(url_str: &str) -> Option<String> {
        let url = Url::parse(url_str).ok()?;
        let host = url.host_str()?;
        let port = url
            .port_or_known_default()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();
        Some(format!("{}://{}{}", url.scheme(), host, port))
    }

    /// Wait for this request's slot on the domain.
    ///
    /// Each caller books `last + delay` (or now, if that has passed) under
    /// the lock and sleeps outside it, so concurrent sessions fire one
    /// delay apart instead of together.
    async fn wait(&self, url: &str) {
        let Some(domain) = Self::domain_key(url) else {
            return;
        };
        let (slot, now) = {
            let mut map = self.last_request.lock().await;
            let now = Instant::now();
            let slot = match map.get(&domain) {
                Some(&last) => (last + self.config.effective_delay()).max(now),
                None => now,
            };
            map.insert(domain.clone(), slot);
            (slot, now)
        };

        if slot > now {
            let sleep_duration = slot - now;
            tracing::debug!(
                domain = %domain,
                sleep_ms = %sleep_duration.as_millis(),
                "Throttling request"
            );
            tokio::time::sleep(sleep_duration).await;
        }
    }
}

/// A [`PageFetcher`] wrapper that enforces per-domain throttling on
/// `navigate` and `click`.
#[derive(Clone)]
pub struct ThrottledFetcher<F> {
    inner: F,
    clock: DomainClock,
}

impl<F: PageFetcher> ThrottledFetcher<F> {
    /// Wrap an existing fetcher with throttling.
    pub fn new(inner: F, config: ThrottleConfig) -> Self {
        Self {
            inner,
            clock: DomainClock {
                config,
                last_request: Arc::new(Mutex::new(HashMap::new())),
            },
        }
    }
}

impl<F: PageFetcher> PageFetcher for ThrottledFetcher<F> {
    type Session = ThrottledSession<F::Session>;

    async fn open(&self) -> Result<Self::Session, AppError> {
        let inner = self.inner.open().await?;
        Ok(ThrottledSession {
            inner,
            clock: self.clock.clone(),
            current_url: None,
        })
    }
}

/// Session opened by a [`ThrottledFetcher`].
pub struct ThrottledSession<S> {
    inner: S,
    clock: DomainClock,
    current_url: Option<String>,
}

impl<S: PageSession> PageSession for ThrottledSession<S> {
    async fn navigate(&mut self, url: &str) -> Result<(), AppError> {
        self.clock.wait(url).await;
        self.current_url = Some(url.to_string());
        self.inner.navigate(url).await
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), AppError> {
        self.inner.wait_for(selector, timeout).await
    }

    async fn content(&mut self) -> Result<String, AppError> {
        self.inner.content().await
    }

    async fn click(&mut self, selector: &str) -> Result<(), AppError> {
        if let Some(url) = &self.current_url {
            self.clock.wait(url).await;
        }
        self.inner.click(selector).await
    }

    async fn close(&mut self) {
        self.inner.close().await;
    }
}

// ---------------------------------------------------------------------------
// Jitter from a xorshift seeded with the current time, no `rand` needed.
// ---------------------------------------------------------------------------

fn rand_jitter_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let mut x = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    // xorshift64
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x % max_ms
}

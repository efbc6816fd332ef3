//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::models::{JobListing, SearchQuery, Source, UNSPECIFIED};
use crate::traits::{JobSource, PageFetcher, PageSession};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Reply {
    Page(String),
    Error(String, bool),
    /// Loads, but `wait_for` never succeeds.
    NeverRenders(String),
}

#[derive(Default)]
struct FetcherState {
    pages: HashMap<String, Reply>,
    /// (from_url, selector) -> to_url
    clicks: HashMap<(String, String), String>,
    /// Served for any URL with no fixture.
    fallback: Option<String>,
    open_error: Option<String>,
    navigations: Vec<String>,
    contents: usize,
    opened: usize,
    closed: usize,
    /// Sessions dropped without `close`.
    dropped: usize,
}

/// Mock page fetcher serving fixture markup by URL.
///
/// Records every navigation and counts opened/closed sessions so tests can
/// assert on pagination bounds and session release.
#[derive(Clone, Default)]
pub struct MockFetcher {
    state: Arc<Mutex<FetcherState>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, markup: &str) -> Self {
        self.insert(url, Reply::Page(markup.to_string()));
        self
    }

    /// Navigating to `url` fails with `error`. Timeouts stay timeouts;
    /// everything else is reported as an HTTP error with the same message.
    pub fn with_error(self, url: &str, error: AppError) -> Self {
        let is_timeout = matches!(error, AppError::Timeout(_));
        self.insert(url, Reply::Error(error.to_string(), is_timeout));
        self
    }

    /// `url` loads but its expected content never appears.
    pub fn with_unrendered_page(self, url: &str, markup: &str) -> Self {
        self.insert(url, Reply::NeverRenders(markup.to_string()));
        self
    }

    /// Clicking `selector` on `from` navigates to `to`.
    pub fn with_click(self, from: &str, selector: &str, to: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .clicks
            .insert((from.to_string(), selector.to_string()), to.to_string());
        self
    }

    /// Serve `markup` for every URL without a fixture, and let every click
    /// succeed. Models a source with endless results.
    pub fn with_fallback(self, markup: &str) -> Self {
        self.state.lock().unwrap().fallback = Some(markup.to_string());
        self
    }

    /// `open()` fails, as when no browser can be launched.
    pub fn with_open_error(self, message: &str) -> Self {
        self.state.lock().unwrap().open_error = Some(message.to_string());
        self
    }

    fn insert(&self, url: &str, reply: Reply) {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(url.to_string(), reply);
    }

    /// Every URL navigated to (including click targets), in order.
    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    /// Number of page snapshots taken.
    pub fn contents_read(&self) -> usize {
        self.state.lock().unwrap().contents
    }

    pub fn sessions_opened(&self) -> usize {
        self.state.lock().unwrap().opened
    }

    pub fn sessions_closed(&self) -> usize {
        self.state.lock().unwrap().closed
    }

    /// Sessions released either by `close` or by being dropped.
    pub fn sessions_released(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.closed + state.dropped
    }
}

impl PageFetcher for MockFetcher {
    type Session = MockSession;

    async fn open(&self) -> Result<MockSession, AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(msg) = &state.open_error {
            return Err(AppError::BrowserError(msg.clone()));
        }
        state.opened += 1;
        Ok(MockSession {
            state: Arc::clone(&self.state),
            current: None,
            closed: false,
            clicks: 0,
        })
    }
}

/// Session handed out by [`MockFetcher`].
pub struct MockSession {
    state: Arc<Mutex<FetcherState>>,
    current: Option<(String, Reply)>,
    closed: bool,
    clicks: usize,
}

impl MockSession {
    fn load(&mut self, url: &str) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        let reply = match state.pages.get(url) {
            Some(reply) => reply.clone(),
            None => match &state.fallback {
                Some(markup) => Reply::Page(markup.clone()),
                None => Reply::Error(format!("HTTP 404 for {url}"), false),
            },
        };
        if let Reply::Error(msg, is_timeout) = &reply {
            self.current = None;
            return Err(if *is_timeout {
                AppError::Timeout(0)
            } else {
                AppError::HttpError(msg.clone())
            });
        }
        self.current = Some((url.to_string(), reply));
        Ok(())
    }
}

impl PageSession for MockSession {
    async fn navigate(&mut self, url: &str) -> Result<(), AppError> {
        self.load(url)
    }

    async fn wait_for(&mut self, _selector: &str, timeout: Duration) -> Result<(), AppError> {
        match &self.current {
            Some((_, Reply::Page(_))) => Ok(()),
            _ => Err(AppError::Timeout(timeout.as_secs())),
        }
    }

    async fn content(&mut self) -> Result<String, AppError> {
        let markup = match &self.current {
            Some((_, Reply::Page(m))) | Some((_, Reply::NeverRenders(m))) => m.clone(),
            _ => return Err(AppError::HttpError("No page loaded".into())),
        };
        self.state.lock().unwrap().contents += 1;
        Ok(markup)
    }

    async fn click(&mut self, selector: &str) -> Result<(), AppError> {
        let Some((from, _)) = &self.current else {
            return Err(AppError::ParseError("No page loaded".into()));
        };
        let target = {
            let state = self.state.lock().unwrap();
            match state.clicks.get(&(from.clone(), selector.to_string())) {
                Some(to) => Some(to.clone()),
                None if state.fallback.is_some() => {
                    Some(format!("{from}#click-{}", self.clicks + 1))
                }
                None => None,
            }
        };
        match target {
            Some(to) => {
                self.clicks += 1;
                self.load(&to)
            }
            None => Err(AppError::ParseError(format!("No element matches {selector}"))),
        }
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.state.lock().unwrap().closed += 1;
        }
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        if !self.closed
            && let Ok(mut state) = self.state.lock()
        {
            state.dropped += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

/// Mock adapter returning a fixed result and recording its calls.
#[derive(Clone)]
pub struct MockSource {
    source: Source,
    listings: Arc<Mutex<Result<Vec<JobListing>, String>>>,
    pub calls: Arc<Mutex<Vec<(SearchQuery, usize)>>>,
    panics: bool,
}

impl MockSource {
    pub fn new(source: Source, listings: Vec<JobListing>) -> Self {
        Self {
            source,
            listings: Arc::new(Mutex::new(Ok(listings))),
            calls: Arc::new(Mutex::new(Vec::new())),
            panics: false,
        }
    }

    /// Adapter whose `search` returns `Err`.
    pub fn failing(source: Source, message: &str) -> Self {
        Self {
            source,
            listings: Arc::new(Mutex::new(Err(message.to_string()))),
            calls: Arc::new(Mutex::new(Vec::new())),
            panics: false,
        }
    }

    /// Adapter whose `search` panics.
    pub fn panicking(source: Source) -> Self {
        Self {
            panics: true,
            ..Self::new(source, Vec::new())
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl JobSource for MockSource {
    fn source(&self) -> Source {
        self.source
    }

    async fn search(
        &self,
        query: &SearchQuery,
        max_pages: usize,
    ) -> Result<Vec<JobListing>, AppError> {
        self.calls
            .lock()
            .unwrap()
            .push((query.clone(), max_pages));
        if self.panics {
            panic!("adapter blew up");
        }
        self.listings
            .lock()
            .unwrap()
            .clone()
            .map_err(AppError::BrowserError)
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a dummy listing. The source is deliberately left at Computrabajo
/// so tests can check that the aggregator re-tags it.
pub fn make_test_listing(title: &str) -> JobListing {
    JobListing {
        title: title.to_string(),
        company: "ACME".to_string(),
        district: "Lima".to_string(),
        salary_text: UNSPECIFIED.to_string(),
        salary_amount: None,
        salary_currency: None,
        publish_date: "Hoy".to_string(),
        link: format!("https://jobs.test/{}", title.replace(' ', "-")),
        source: Source::Computrabajo,
    }
}

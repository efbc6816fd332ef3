use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{JobListing, SearchQuery, Source};

/// Opens page sessions against a rendering backend (plain HTTP or a browser).
///
/// The core never sees how pages are rendered; anything from a raw GET to a
/// headless Chromium tab satisfies this.
pub trait PageFetcher: Send + Sync + Clone {
    type Session: PageSession;

    fn open(&self) -> impl Future<Output = Result<Self::Session, AppError>> + Send;
}

/// One exclusively-owned browsing context.
///
/// Sessions are never shared between tasks. Whoever opens a session must
/// call [`close`](Self::close) before returning. Implementations also
/// release their resources on drop, so a cancelled or panicking search
/// cannot leak them.
pub trait PageSession: Send {
    /// Load `url`, replacing the current page.
    fn navigate(&mut self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Wait up to `timeout` for an element matching `selector` to exist.
    ///
    /// Returns [`AppError::Timeout`] when it never shows up.
    fn wait_for(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Snapshot of the current page's markup.
    fn content(&mut self) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Activate the first element matching `selector` (e.g. a "next page" link).
    fn click(&mut self, selector: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Release the session. Calling it more than once is a no-op.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// A per-source adapter: URL negotiation, extraction, and post-filtering.
///
/// `Err` means the source could not be queried at all (e.g. no session
/// could be opened). Failures after that point are recovered inside the
/// adapter, which returns whatever it collected.
pub trait JobSource: Send + Sync {
    fn source(&self) -> Source;

    fn search(
        &self,
        query: &SearchQuery,
        max_pages: usize,
    ) -> impl Future<Output = Result<Vec<JobListing>, AppError>> + Send;
}

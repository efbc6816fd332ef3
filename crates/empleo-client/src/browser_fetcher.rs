use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chromiumoxide::{Browser, BrowserConfig, Page};
use empleo_core::error::AppError;
use empleo_core::traits::{PageFetcher, PageSession};
use futures::StreamExt;

use crate::fetcher::USER_AGENT;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Headless-browser page fetcher using Chromium via the Chrome DevTools
/// Protocol.
///
/// Unlike [`super::HttpFetcher`], this runs the page's scripts, which
/// Bumeran needs before its result list exists.
///
/// A single Chromium process is shared across all clones of this struct;
/// each session is one tab, closed by [`PageSession::close`] or on drop.
///
/// # Example
///
/// ```rust,no_run
/// use empleo_client::BrowserFetcher;
/// use empleo_core::traits::{PageFetcher, PageSession};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = BrowserFetcher::new().await?;
/// let mut tab = fetcher.open().await?;
/// tab.navigate("https://www.bumeran.com.pe").await?;
/// let html = tab.content().await?;
/// tab.close().await;
/// println!("{}", &html[..200]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BrowserFetcher {
    browser: Arc<Browser>,
    timeout: Duration,
}

impl BrowserFetcher {
    /// Launches a headless Chromium browser with a **30 s** navigation timeout.
    ///
    /// Requires a Chromium / Chrome binary reachable via `$PATH` (or the
    /// default locations checked by `chromiumoxide`).
    pub async fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30)).await
    }

    /// Launches a headless Chromium browser with a custom navigation timeout.
    pub async fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder();
        builder = builder.no_sandbox().disable_default_args();

        // The snap wrapper rejects standard Chrome flags (--headless, ...),
        // so prefer the real binary inside the snap when there is one.
        if let Some(bin) = Self::find_chrome_binary() {
            tracing::info!(binary = %bin.display(), "Using Chrome binary");
            builder = builder.chrome_executable(bin);
        }

        let config = builder
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-popup-blocking")
            .arg("--no-first-run")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--window-size=1920,1080")
            .arg(format!("--user-agent={USER_AGENT}"))
            .build()
            .map_err(|e| AppError::BrowserError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to launch browser: {e}")))?;

        // The CDP handler must be polled continuously for the connection to work.
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    tracing::warn!("Browser CDP handler error: {event:?}");
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            timeout,
        })
    }

    /// Locate a usable Chrome/Chromium binary: `$CHROME_BIN`, then the real
    /// binary inside a snap, then well-known system paths. `None` lets
    /// `chromiumoxide` do its own lookup.
    fn find_chrome_binary() -> Option<PathBuf> {
        if let Ok(p) = std::env::var("CHROME_BIN") {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }

        [
            "/snap/chromium/current/usr/lib/chromium-browser/chrome",
            "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
        ]
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    }
}

impl PageFetcher for BrowserFetcher {
    type Session = BrowserSession;

    async fn open(&self) -> Result<BrowserSession, AppError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to open tab: {e}")))?;

        Ok(BrowserSession {
            page: Some(page),
            timeout: self.timeout,
        })
    }
}

/// One browser tab.
pub struct BrowserSession {
    page: Option<Page>,
    timeout: Duration,
}

impl BrowserSession {
    fn page(&self) -> Result<&Page, AppError> {
        self.page
            .as_ref()
            .ok_or_else(|| AppError::BrowserError("Tab already closed".to_string()))
    }
}

impl PageSession for BrowserSession {
    async fn navigate(&mut self, url: &str) -> Result<(), AppError> {
        let page = self.page()?;
        match tokio::time::timeout(self.timeout, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AppError::HttpError(format!(
                "Failed to navigate to {url}: {e}"
            ))),
            Err(_) => Err(AppError::Timeout(self.timeout.as_secs())),
        }
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), AppError> {
        let page = self.page()?;
        let deadline = Instant::now() + timeout;
        loop {
            if page.find_element(selector).await.is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AppError::Timeout(timeout.as_secs()));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn content(&mut self) -> Result<String, AppError> {
        self.page()?
            .content()
            .await
            .map_err(|e| AppError::BrowserError(format!("Failed to read page content: {e}")))
    }

    async fn click(&mut self, selector: &str) -> Result<(), AppError> {
        let page = self.page()?;
        let element = page
            .find_element(selector)
            .await
            .map_err(|e| AppError::ParseError(format!("No element matches {selector}: {e}")))?;

        let clicked = tokio::time::timeout(self.timeout, async {
            element.click().await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        })
        .await;

        match clicked {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(AppError::BrowserError(format!("Click on {selector} failed: {e}"))),
            Err(_) => Err(AppError::Timeout(self.timeout.as_secs())),
        }
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
    }
}

impl Drop for BrowserSession {
    /// Closes a tab the caller never closed (cancelled or panicked search).
    fn drop(&mut self) {
        if let Some(page) = self.page.take()
            && let Ok(handle) = tokio::runtime::Handle::try_current()
        {
            handle.spawn(async move {
                if let Err(e) = page.close().await {
                    tracing::debug!(error = %e, "Failed to close abandoned tab");
                }
            });
        }
    }
}

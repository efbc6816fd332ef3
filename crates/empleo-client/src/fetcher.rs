use std::time::Duration;

use empleo_core::error::AppError;
use empleo_core::traits::{PageFetcher, PageSession};
use reqwest::Client;
use url::Url;

use crate::html;

/// Desktop Chrome user agent. Both job boards serve reduced markup (or a
/// block page) to agents they do not recognise.
pub(crate) const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Plain HTTP page fetcher using reqwest.
///
/// Pages are taken as served, without running scripts. `click` follows the
/// `href` of the first matching element and `wait_for` checks the loaded
/// markup once, so this works for server-rendered listings only.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let timeout_secs = timeout.as_secs();
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

impl PageFetcher for HttpFetcher {
    type Session = HttpSession;

    async fn open(&self) -> Result<HttpSession, AppError> {
        Ok(HttpSession {
            client: self.client.clone(),
            timeout_secs: self.timeout_secs,
            page: None,
        })
    }
}

struct LoadedPage {
    url: Url,
    body: String,
}

/// Session opened by [`HttpFetcher`]. Holds the last page loaded.
pub struct HttpSession {
    client: Client,
    timeout_secs: u64,
    page: Option<LoadedPage>,
}

impl HttpSession {
    fn loaded(&self) -> Result<&LoadedPage, AppError> {
        self.page
            .as_ref()
            .ok_or_else(|| AppError::HttpError("No page loaded".to_string()))
    }
}

impl PageSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), AppError> {
        self.page = None;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else if e.is_connect() {
                AppError::NetworkError(format!("Connection failed: {e}"))
            } else {
                AppError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        // Redirects change the base for relative links.
        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {e}")))?;

        tracing::debug!(url = %final_url, bytes = body.len(), "Page loaded");
        self.page = Some(LoadedPage {
            url: final_url,
            body,
        });
        Ok(())
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<(), AppError> {
        let page = self.loaded()?;
        if html::contains(&page.body, selector)? {
            Ok(())
        } else {
            Err(AppError::Timeout(timeout.as_secs()))
        }
    }

    async fn content(&mut self) -> Result<String, AppError> {
        Ok(self.loaded()?.body.clone())
    }

    async fn click(&mut self, selector: &str) -> Result<(), AppError> {
        let target = {
            let page = self.loaded()?;
            let href = html::first_href(&page.body, selector)?
                .ok_or_else(|| AppError::ParseError(format!("No link matches {selector}")))?;
            page.url
                .join(&href)
                .map_err(|e| AppError::ParseError(format!("Bad link {href}: {e}")))?
        };
        self.navigate(target.as_str()).await
    }

    async fn close(&mut self) {
        self.page = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(url: &str, body: &str) -> HttpSession {
        let fetcher = HttpFetcher::new().unwrap();
        HttpSession {
            client: fetcher.client,
            timeout_secs: fetcher.timeout_secs,
            page: Some(LoadedPage {
                url: Url::parse(url).unwrap(),
                body: body.to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn test_wait_for_present_selector() {
        let mut session = session_with(
            "https://www.bumeran.com.pe/empleos.html",
            r#"<div id="listado-avisos"></div>"#,
        );
        session
            .wait_for("#listado-avisos", Duration::from_secs(15))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_missing_selector_times_out() {
        let mut session = session_with("https://www.bumeran.com.pe/", "<div></div>");
        let err = session
            .wait_for("#listado-avisos", Duration::from_secs(15))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout(15)));
    }

    #[tokio::test]
    async fn test_content_without_page_is_error() {
        let mut session = HttpFetcher::new().unwrap().open().await.unwrap();
        assert!(session.content().await.is_err());
    }

    #[tokio::test]
    async fn test_click_without_matching_link_is_parse_error() {
        let mut session = session_with("https://pe.computrabajo.com/trabajo", "<p>last page</p>");
        let err = session.click("a[title='Siguiente']").await.unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }

    #[tokio::test]
    async fn test_close_drops_page_and_is_idempotent() {
        let mut session = session_with("https://pe.computrabajo.com/", "<p>x</p>");
        session.close().await;
        session.close().await;
        assert!(session.content().await.is_err());
    }
}

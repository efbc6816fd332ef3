//! Page-dependent search URL construction.
//!
//! Some sources only reveal valid filter values inside a rendered results
//! page, so the final search URL is built in phases: each phase sees the
//! current [`SearchState`] (and, if it asks for one, the page at the current
//! URL) and returns the refined state. Phases are plain functions of their
//! inputs, which keeps them testable against fixture markup.

use crate::error::AppError;
use crate::traits::PageSession;

/// Evolving search URL plus whatever filter tokens were discovered so far.
///
/// Lives for one adapter invocation only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchState {
    pub url: String,
    pub experience_token: Option<String>,
    pub salary_token: Option<String>,
}

impl SearchState {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            experience_token: None,
            salary_token: None,
        }
    }

    /// The URL without its query string.
    pub fn path(&self) -> &str {
        self.url.split_once('?').map_or(self.url.as_str(), |(p, _)| p)
    }

    /// The query string without the leading `?`, if any.
    pub fn query(&self) -> Option<&str> {
        self.url.split_once('?').map(|(_, q)| q).filter(|q| !q.is_empty())
    }

    /// Append `key=value`, choosing `?` or `&` as needed.
    pub fn append_param(&mut self, key: &str, value: &str) {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        self.url = format!("{}{sep}{key}={value}", self.url);
    }

    /// Add `suffix` to the end of the path, keeping any query string after it.
    pub fn push_path_suffix(&mut self, suffix: &str) {
        self.url = match self.query() {
            Some(q) => format!("{}{suffix}?{q}", self.path()),
            None => format!("{}{suffix}", self.path()),
        };
    }
}

/// One refinement step of URL negotiation.
pub trait Phase: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether [`apply`](Self::apply) needs the page at the current URL.
    fn needs_page(&self) -> bool {
        false
    }

    /// Produce the refined state. `page` is `Some` iff `needs_page()` and the
    /// page was fetched.
    fn apply(&self, state: SearchState, page: Option<&str>) -> SearchState;
}

/// Run `phases` in order over `state`, fetching pages through `session`.
///
/// A phase whose page cannot be fetched is skipped; negotiation never fails.
pub async fn negotiate<S: PageSession>(
    session: &mut S,
    mut state: SearchState,
    phases: &[Box<dyn Phase>],
) -> SearchState {
    // (url, markup) of the last page fetched, reused while the URL is unchanged.
    let mut last_page: Option<(String, String)> = None;

    for phase in phases {
        if !phase.needs_page() {
            state = phase.apply(state, None);
            tracing::debug!(phase = phase.name(), url = %state.url, "Phase applied");
            continue;
        }

        let cached = last_page.as_ref().is_some_and(|(url, _)| *url == state.url);
        if !cached {
            match fetch(session, &state.url).await {
                Ok(markup) => last_page = Some((state.url.clone(), markup)),
                Err(e) => {
                    tracing::warn!(phase = phase.name(), url = %state.url, error = %e, "Skipping phase");
                    last_page = None;
                    continue;
                }
            }
        }

        let page = last_page.as_ref().map(|(_, markup)| markup.as_str());
        state = phase.apply(state, page);
        tracing::debug!(phase = phase.name(), url = %state.url, "Phase applied");
    }

    state
}

async fn fetch<S: PageSession>(session: &mut S, url: &str) -> Result<String, AppError> {
    session.navigate(url).await?;
    session.content().await
}

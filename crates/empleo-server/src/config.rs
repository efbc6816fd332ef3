use std::str::FromStr;
use std::time::Duration;

use empleo_core::AppError;
use empleo_core::aggregate::DEFAULT_MAX_PAGES;

/// How pages are fetched from the job boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetcherKind {
    /// Plain HTTP requests; pages are not rendered.
    Http,
    /// Headless Chromium (requires the `browser` feature).
    Browser,
}

impl FromStr for FetcherKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" => Ok(FetcherKind::Http),
            "browser" => Ok(FetcherKind::Browser),
            other => Err(AppError::ConfigError(format!(
                "Invalid EMPLEO_FETCHER '{other}': expected 'http' or 'browser'"
            ))),
        }
    }
}

/// Configuration for the search server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub max_pages: usize,
    pub fetcher: FetcherKind,
    /// Minimum delay between requests to one host; zero disables throttling.
    pub throttle: Duration,
    pub detail_concurrency: usize,
    pub fetch_timeout: Duration,
}

impl ServerConfig {
    /// Read configuration from environment variables.
    ///
    /// - `EMPLEO_PORT` (optional, defaults to 5000)
    /// - `EMPLEO_MAX_PAGES` (optional, defaults to 3)
    /// - `EMPLEO_FETCHER` (optional, `http` or `browser`, defaults to `http`)
    /// - `EMPLEO_THROTTLE_MS` (optional, defaults to 0 = off)
    /// - `EMPLEO_DETAIL_CONCURRENCY` (optional, defaults to 4)
    /// - `EMPLEO_FETCH_TIMEOUT_SECS` (optional, defaults to 30)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let fetcher = match lookup("EMPLEO_FETCHER") {
            None => FetcherKind::Http,
            Some(raw) => raw.parse()?,
        };

        let max_pages: usize = parse_or(&lookup, "EMPLEO_MAX_PAGES", DEFAULT_MAX_PAGES)?;
        if max_pages == 0 {
            return Err(AppError::ConfigError(
                "EMPLEO_MAX_PAGES must be at least 1".into(),
            ));
        }

        let detail_concurrency: usize = parse_or(&lookup, "EMPLEO_DETAIL_CONCURRENCY", 4)?;
        if detail_concurrency == 0 {
            return Err(AppError::ConfigError(
                "EMPLEO_DETAIL_CONCURRENCY must be at least 1".into(),
            ));
        }

        Ok(Self {
            port: parse_or(&lookup, "EMPLEO_PORT", 5000)?,
            max_pages,
            fetcher,
            throttle: Duration::from_millis(parse_or(&lookup, "EMPLEO_THROTTLE_MS", 0)?),
            detail_concurrency,
            fetch_timeout: Duration::from_secs(parse_or(&lookup, "EMPLEO_FETCH_TIMEOUT_SECS", 30)?),
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            AppError::ConfigError(format!(
                "Invalid {name} '{raw}': must be a non-negative integer"
            ))
        }),
    }
}

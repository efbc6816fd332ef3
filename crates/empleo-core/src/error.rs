use thiserror::Error;

/// Application-wide error types for Empleo.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Expected content did not appear in time.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// Headless browser could not be launched or driven.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// Markup could not be interpreted (bad selector, missing element).
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Inbound search parameters were rejected.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

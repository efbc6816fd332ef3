//! Markup helpers shared by the source adapters.
//!
//! `scraper::Html` is not `Send`, so documents are parsed and dropped inside
//! synchronous functions; only owned strings cross an `.await`.

use empleo_core::error::AppError;
use empleo_core::normalize::is_blank_or;
use scraper::{ElementRef, Html, Selector};

/// One way of locating a field inside a listing card: the text of a
/// matching element, else its `attr` attribute.
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub selector: &'static str,
    pub attr: &'static str,
}

impl Strategy {
    pub const fn new(selector: &'static str, attr: &'static str) -> Self {
        Self { selector, attr }
    }

    fn read(&self, el: ElementRef<'_>) -> Option<String> {
        Some(element_text(el))
            .filter(|t| !t.is_empty())
            .or_else(|| {
                el.value()
                    .attr(self.attr)
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            })
    }
}

/// Try `strategies` in order and return the first value that is neither
/// blank nor in `blacklist` (compared lowercase).
pub fn first_match(
    scope: ElementRef<'_>,
    strategies: &[Strategy],
    blacklist: &[&str],
) -> Option<String> {
    strategies.iter().find_map(|strategy| {
        let sel = Selector::parse(strategy.selector).ok()?;
        scope
            .select(&sel)
            .filter_map(|el| strategy.read(el))
            .find(|value| !is_blank_or(value, blacklist))
    })
}

/// Parse a CSS selector supplied at runtime.
pub fn selector(css: &str) -> Result<Selector, AppError> {
    Selector::parse(css).map_err(|e| AppError::ParseError(format!("Invalid selector {css}: {e}")))
}

/// Whether any element in `markup` matches `css`.
pub fn contains(markup: &str, css: &str) -> Result<bool, AppError> {
    let sel = selector(css)?;
    let doc = Html::parse_document(markup);
    Ok(doc.select(&sel).next().is_some())
}

/// `href` of the first element in `markup` matching `css`.
pub fn first_href(markup: &str, css: &str) -> Result<Option<String>, AppError> {
    let sel = selector(css)?;
    let doc = Html::parse_document(markup);
    Ok(doc
        .select(&sel)
        .find_map(|el| el.value().attr("href"))
        .map(str::to_string))
}

/// All text below `el`, whitespace-collapsed.
pub fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// Text of the first descendant of `el` matching `sel`, if non-empty.
pub fn child_text(el: ElementRef<'_>, sel: &Selector) -> Option<String> {
    el.select(sel)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

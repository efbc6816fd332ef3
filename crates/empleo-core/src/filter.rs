//! Local re-check of salary and experience bounds.
//!
//! Upstream filters are incomplete or ignored, so every listing goes through
//! here before it is emitted. Missing information never satisfies a bound.

use crate::models::SearchQuery;

/// True when a parsed salary amount fits the query's salary range.
pub fn salary_matches(query: &SearchQuery, amount: Option<u64>) -> bool {
    let min = query.salary_min.filter(|&m| m > 0);
    let max = query.salary_max.filter(|&m| m > 0);

    if let Some(min) = min
        && amount.is_none_or(|a| a < min)
    {
        return false;
    }
    if let Some(max) = max
        && amount.is_none_or(|a| a > max)
    {
        return false;
    }
    true
}

/// True when the experience a listing asks for fits the query.
///
/// A request for 0 years only accepts listings that explicitly need none;
/// a request for N years accepts listings asking for at least N.
pub fn experience_matches(query: &SearchQuery, required: Option<u32>) -> bool {
    match query.experience_years {
        None => true,
        Some(0) => required == Some(0),
        Some(years) => required.is_some_and(|r| r >= years),
    }
}

//! Field normalizers shared by every source adapter.
//!
//! Sources print salaries, dates, and locations in whatever shape their
//! templates happen to use. Everything here is a pure function that maps
//! that text onto the canonical [`JobListing`](crate::models::JobListing)
//! representation, degrading to "unknown" instead of failing.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::{Currency, DEFAULT_DISTRICT, UNSPECIFIED};

/// Salary strings that mean "not published".
const UNSPECIFIED_SALARIES: &[&str] = &["no especificado", "a convenir", "a tratar"];

static SALARY_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,.]*)\s*(?:a|-)\s*(?:s/\.?|\$|usd)?\s*(\d[\d,.]*)")
        .expect("valid salary range regex")
});

static SALARY_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,2}[,.]\d{3}(?:[,.]\d{2,3})?|\d{3,}").expect("valid salary amount regex")
});

static DAYS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"hace\s+(\d+)\s+d[ií]a").expect("valid days regex"));

static WEEKS_AGO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"hace\s+(\d+)\s+semana").expect("valid weeks regex"));

static ABSOLUTE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}/\d{1,2}/\d{4})\b").expect("valid absolute date regex")
});

// ---------------------------------------------------------------------------
// Salary
// ---------------------------------------------------------------------------

/// Parse a printed salary into `(amount, currency)`.
///
/// Ranges resolve to their lower bound. Any text without a recognisable
/// number yields `None` for the amount, while still reporting the currency
/// if a marker was present.
pub fn parse_salary(raw: &str) -> (Option<u64>, Option<Currency>) {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();
    if trimmed.is_empty() || UNSPECIFIED_SALARIES.contains(&lower.as_str()) {
        return (None, None);
    }

    let currency = if lower.contains("s/") || lower.contains("sol") {
        Some(Currency::Pen)
    } else if lower.contains('$') || lower.contains("usd") {
        Some(Currency::Usd)
    } else {
        None
    };

    let token = match SALARY_RANGE.captures(trimmed) {
        Some(caps) => caps.get(1).map(|m| m.as_str()),
        None => SALARY_AMOUNT.find(trimmed).map(|m| m.as_str()),
    };

    let amount = token.and_then(|t| strip_grouping(t).parse::<u64>().ok());
    (amount, currency)
}

/// Remove thousands separators, dropping a trailing two-digit decimal part.
fn strip_grouping(token: &str) -> String {
    let token = token.trim_end_matches(['.', ',']);
    let integral = match token.rfind(['.', ',']) {
        Some(idx) if token.len() - idx - 1 == 2 => &token[..idx],
        _ => token,
    };
    integral.chars().filter(char::is_ascii_digit).collect()
}

// ---------------------------------------------------------------------------
// Publish date
// ---------------------------------------------------------------------------

/// Map a relative-date phrase onto its canonical token.
///
/// `None` and empty input mean the listing was published today.
pub fn normalize_date(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return "Hoy".to_string();
    };
    let f = raw.to_lowercase();

    if f.contains("hoy") {
        return "Hoy".to_string();
    }
    if f.contains("ayer") {
        return "Ayer".to_string();
    }
    if f.contains("hace") && (f.contains("hora") || f.contains("minuto")) {
        return "Hoy".to_string();
    }
    if f.contains("hace") && (f.contains("día") || f.contains("dia")) {
        return match DAYS_AGO.captures(&f) {
            Some(caps) => format!("Hace {} días", &caps[1]),
            None => "Hace días".to_string(),
        };
    }
    if f.contains("hace") && f.contains("semana") {
        return match WEEKS_AGO.captures(&f) {
            Some(caps) => format!("Hace {} semanas", &caps[1]),
            None => "Hace semanas".to_string(),
        };
    }
    if let Some(caps) = ABSOLUTE_DATE.captures(&f)
        && let Ok(date) = NaiveDate::parse_from_str(&caps[1], "%d/%m/%Y")
    {
        return date.format("%Y-%m-%d").to_string();
    }

    title_case(&f)
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// District label used when a listing does not say where it is.
pub fn district_label(requested: &str) -> String {
    let requested = requested.trim();
    if requested.is_empty() {
        DEFAULT_DISTRICT.to_string()
    } else {
        title_case(requested)
    }
}

/// Pick the listing's printed location when it carries real information,
/// else fall back to the requested district.
pub fn resolve_location(raw: Option<&str>, requested: &str) -> String {
    if let Some(location) = raw.map(str::trim).filter(|s| !s.is_empty()) {
        let lower = location.to_lowercase();
        let length = location.chars().count();
        let looks_like_address = ["calle", "jr", "av", ","]
            .iter()
            .any(|kw| lower.contains(kw));

        if looks_like_address && length > 10 {
            return location.to_string();
        }
        if lower != "lima" && length > 3 {
            return location.to_string();
        }
    }
    district_label(requested)
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

/// URL slug: lowercase ASCII alphanumerics joined by single hyphens.
///
/// Idempotent, so already-slugged text passes through unchanged.
pub fn slugify(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .chars()
        .map(fold_diacritic)
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();

    folded
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Computrabajo always needs a district segment; Lima stands in for none.
pub fn computrabajo_district_slug(district: &str) -> String {
    let slug = slugify(district);
    if slug.is_empty() {
        "lima".to_string()
    } else {
        slug
    }
}

/// Bumeran omits the district path entirely for Lima or no district.
pub fn bumeran_district_slug(district: &str) -> String {
    let slug = slugify(district);
    if slug == "lima" { String::new() } else { slug }
}

fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

/// Capitalise the first letter of every word, lowercasing the rest.
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// True when a scraped value is missing or one of the given placeholders.
pub fn is_blank_or(value: &str, blacklist: &[&str]) -> bool {
    let lower = value.trim().to_lowercase();
    lower.is_empty() || lower == UNSPECIFIED.to_lowercase() || blacklist.contains(&lower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_salary_soles_with_grouping() {
        assert_eq!(parse_salary("S/ 2,500"), (Some(2500), Some(Currency::Pen)));
        assert_eq!(parse_salary("S/. 1.800"), (Some(1800), Some(Currency::Pen)));
        assert_eq!(parse_salary("2500 soles"), (Some(2500), Some(Currency::Pen)));
    }

    #[test]
    fn test_parse_salary_range_takes_lower_bound() {
        assert_eq!(
            parse_salary("$1200 - $1500"),
            (Some(1200), Some(Currency::Usd))
        );
        assert_eq!(
            parse_salary("S/ 2,000 a S/ 3,000"),
            (Some(2000), Some(Currency::Pen))
        );
        assert_eq!(parse_salary("1500-2000 USD"), (Some(1500), Some(Currency::Usd)));
    }

    #[test]
    fn test_parse_salary_drops_cents() {
        assert_eq!(
            parse_salary("S/ 2,500.00"),
            (Some(2500), Some(Currency::Pen))
        );
    }

    #[test]
    fn test_parse_salary_unspecified() {
        assert_eq!(parse_salary("No especificado"), (None, None));
        assert_eq!(parse_salary("  NO ESPECIFICADO "), (None, None));
        assert_eq!(parse_salary(""), (None, None));
    }

    #[test]
    fn test_parse_salary_currency_without_amount() {
        assert_eq!(parse_salary("Sueldo en soles"), (None, Some(Currency::Pen)));
        assert_eq!(parse_salary("Competitivo"), (None, None));
        // Two-digit numbers are not treated as salaries.
        assert_eq!(parse_salary("S/ 50"), (None, Some(Currency::Pen)));
    }

    #[test]
    fn test_parse_salary_is_deterministic() {
        let inputs = ["S/ 2,500", "$1200 - $1500", "basura 12", "1.234.567"];
        for input in inputs {
            assert_eq!(parse_salary(input), parse_salary(input));
        }
    }

    #[test]
    fn test_normalize_date_relative_tokens() {
        assert_eq!(normalize_date(Some("Hace 3 días")), "Hace 3 días");
        assert_eq!(normalize_date(Some("Publicado hace 12 dias")), "Hace 12 días");
        assert_eq!(normalize_date(Some("hace 2 semanas")), "Hace 2 semanas");
        assert_eq!(normalize_date(Some("Hace unos días")), "Hace días");
        assert_eq!(normalize_date(Some("Hoy")), "Hoy");
        assert_eq!(normalize_date(Some("Actualizada ayer")), "Ayer");
        assert_eq!(normalize_date(Some("Hace 5 horas")), "Hoy");
    }

    #[test]
    fn test_normalize_date_empty_is_today() {
        assert_eq!(normalize_date(Some("")), "Hoy");
        assert_eq!(normalize_date(Some("   ")), "Hoy");
        assert_eq!(normalize_date(None), "Hoy");
    }

    #[test]
    fn test_normalize_date_absolute_and_unmatched() {
        assert_eq!(normalize_date(Some("Publicado el 03/10/2026")), "2026-10-03");
        assert_eq!(normalize_date(Some("HACE UN MES")), "Hace Un Mes");
    }

    #[test]
    fn test_resolve_location() {
        assert_eq!(
            resolve_location(Some("Av. Javier Prado 123, San Isidro"), "san isidro"),
            "Av. Javier Prado 123, San Isidro"
        );
        assert_eq!(resolve_location(Some("Miraflores"), ""), "Miraflores");
        assert_eq!(resolve_location(Some("Lima"), "san isidro"), "San Isidro");
        assert_eq!(resolve_location(Some("Ate"), "surco"), "Surco");
        assert_eq!(resolve_location(None, ""), "Lima");
        assert_eq!(resolve_location(Some("  "), "la molina"), "La Molina");
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("San Juan de Lurigancho"), "san-juan-de-lurigancho");
        assert_eq!(slugify("Breña"), "brena");
        assert_eq!(slugify("  Jesús María "), "jesus-maria");
        assert_eq!(slugify("Analista (Sr.) / Datos"), "analista-sr-datos");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_slugify_is_idempotent_and_clean() {
        let inputs = [
            "San Isidro",
            "Jesús  María",
            "a--b",
            "-lead-",
            "Ñuñoa 2",
            "日本 office",
            "C++ developer",
        ];
        for input in inputs {
            let once = slugify(input);
            assert_eq!(slugify(&once), once, "not idempotent for {input:?}");
            assert!(
                once.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'),
                "bad characters in {once:?}"
            );
            assert!(!once.starts_with('-') && !once.ends_with('-'));
        }
    }

    #[test]
    fn test_source_district_conventions() {
        assert_eq!(computrabajo_district_slug(""), "lima");
        assert_eq!(computrabajo_district_slug("Lima"), "lima");
        assert_eq!(computrabajo_district_slug("San Borja"), "san-borja");
        assert_eq!(bumeran_district_slug(""), "");
        assert_eq!(bumeran_district_slug(" lima "), "");
        assert_eq!(bumeran_district_slug("San Borja"), "san-borja");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("san isidro"), "San Isidro");
        assert_eq!(title_case("LA MOLINA"), "La Molina");
    }

    #[test]
    fn test_is_blank_or() {
        assert!(is_blank_or("  ", &[]));
        assert!(is_blank_or("No especificado", &[]));
        assert!(is_blank_or("Confidencial", &["confidencial"]));
        assert!(!is_blank_or("ACME", &["confidencial"]));
    }
}

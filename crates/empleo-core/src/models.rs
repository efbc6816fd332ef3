use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Placeholder shown when a source does not publish a field.
pub const UNSPECIFIED: &str = "No especificado";

/// District assumed when the query does not name one.
pub const DEFAULT_DISTRICT: &str = "Lima";

/// A job-listing platform the aggregator knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Computrabajo,
    Bumeran,
}

impl Source {
    /// Fixed order in which sources are queried and merged.
    pub const ALL: [Source; 2] = [Source::Computrabajo, Source::Bumeran];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Computrabajo => "Computrabajo",
            Source::Bumeran => "Bumeran",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which sources a search should hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceSelection {
    #[default]
    All,
    Only(Source),
}

impl SourceSelection {
    pub fn includes(&self, source: Source) -> bool {
        match self {
            SourceSelection::All => true,
            SourceSelection::Only(s) => *s == source,
        }
    }
}

impl FromStr for SourceSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" | "todos" => Ok(SourceSelection::All),
            "computrabajo" => Ok(SourceSelection::Only(Source::Computrabajo)),
            "bumeran" => Ok(SourceSelection::Only(Source::Bumeran)),
            other => Err(format!("Unknown source: {other}")),
        }
    }
}

/// Currency a salary is quoted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "PEN")]
    Pen,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Pen => "PEN",
            Currency::Usd => "USD",
        }
    }
}

/// Search parameters for one aggregated search.
///
/// Salary bounds of zero are stored as `None`: the upstream UI uses 0 to
/// mean "any salary".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub title: String,
    pub district: String,
    pub salary_min: Option<u64>,
    pub salary_max: Option<u64>,
    /// 0 means "no experience required".
    pub experience_years: Option<u32>,
    pub schedule: Option<String>,
    pub sources: SourceSelection,
}

impl SearchQuery {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_district(mut self, district: impl Into<String>) -> Self {
        self.district = district.into();
        self
    }

    pub fn with_salary_min(mut self, min: Option<u64>) -> Self {
        self.salary_min = min.filter(|&m| m > 0);
        self
    }

    pub fn with_salary_max(mut self, max: Option<u64>) -> Self {
        self.salary_max = max.filter(|&m| m > 0);
        self
    }

    pub fn with_experience(mut self, years: Option<u32>) -> Self {
        self.experience_years = years;
        self
    }

    pub fn with_schedule(mut self, schedule: Option<String>) -> Self {
        self.schedule = schedule
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self
    }

    pub fn with_sources(mut self, sources: SourceSelection) -> Self {
        self.sources = sources;
        self
    }
}

/// One job posting in the canonical output schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListing {
    #[serde(rename = "Título")]
    pub title: String,
    #[serde(rename = "Empresa")]
    pub company: String,
    #[serde(rename = "Distrito")]
    pub district: String,
    /// Salary as printed by the source.
    #[serde(rename = "Salario")]
    pub salary_text: String,
    #[serde(rename = "SalarioMonto")]
    pub salary_amount: Option<u64>,
    #[serde(rename = "Moneda")]
    pub salary_currency: Option<Currency>,
    #[serde(rename = "Fecha publicación")]
    pub publish_date: String,
    /// Always an absolute URL.
    #[serde(rename = "Enlace")]
    pub link: String,
    #[serde(rename = "Fuente")]
    pub source: Source,
}

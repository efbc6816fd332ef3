use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use empleo_core::AppError;
use empleo_core::aggregate::{AggregateReport, SourceOutcome, SourceStatus};
use empleo_core::models::{JobListing, SearchQuery, SourceSelection};

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Query parameters of `GET /api/search`.
///
/// Spanish names are canonical; the English aliases are accepted too.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Job title to search for (alias `title`).
    #[serde(default, alias = "title")]
    pub cargo: Option<String>,
    /// District within Lima (alias `district`).
    #[serde(default, alias = "district")]
    pub distrito: Option<String>,
    /// Minimum monthly salary; 0 or empty means no bound (alias `salary_min`).
    #[serde(default, alias = "salary_min", deserialize_with = "blank_as_none")]
    pub sueldo_min: Option<u64>,
    /// Maximum monthly salary; 0 or empty means no bound (alias `salary_max`).
    #[serde(default, alias = "salary_max", deserialize_with = "blank_as_none")]
    pub sueldo_max: Option<u64>,
    /// Years of experience; 0 asks for postings that need none (alias `experience`).
    #[serde(default, alias = "experience", deserialize_with = "blank_as_none")]
    pub experiencia: Option<u32>,
    /// Schedule slug, e.g. `tiempo-completo` (alias `schedule`).
    #[serde(default, alias = "schedule")]
    pub jornada: Option<String>,
    /// `todos`, `computrabajo` or `bumeran` (alias `source`).
    #[serde(default, alias = "source")]
    pub fuente: Option<String>,
}

impl SearchParams {
    pub fn into_query(self) -> Result<SearchQuery, AppError> {
        let sources = match self.fuente.as_deref() {
            None => SourceSelection::All,
            Some(raw) => raw.parse().map_err(AppError::InvalidQuery)?,
        };

        Ok(SearchQuery::new(self.cargo.unwrap_or_default().trim())
            .with_district(self.distrito.unwrap_or_default().trim())
            .with_salary_min(self.sueldo_min)
            .with_salary_max(self.sueldo_max)
            .with_experience(self.experiencia)
            .with_schedule(self.jornada)
            .with_sources(sources))
    }
}

/// HTML forms send empty strings for untouched numeric inputs.
fn blank_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// One listing, with the field labels the web front-end reads.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct JobListingResponse {
    #[serde(rename = "Título")]
    pub title: String,
    #[serde(rename = "Empresa")]
    pub company: String,
    #[serde(rename = "Distrito")]
    pub district: String,
    #[serde(rename = "Salario")]
    pub salary: String,
    #[serde(rename = "SalarioMonto")]
    pub salary_amount: Option<u64>,
    /// `PEN` or `USD` when the salary names a currency.
    #[serde(rename = "Moneda")]
    pub currency: Option<String>,
    #[serde(rename = "Fecha publicación")]
    pub published: String,
    #[serde(rename = "Enlace")]
    pub link: String,
    /// `Computrabajo` or `Bumeran`.
    #[serde(rename = "Fuente")]
    pub source: String,
}

impl From<JobListing> for JobListingResponse {
    fn from(listing: JobListing) -> Self {
        Self {
            title: listing.title,
            company: listing.company,
            district: listing.district,
            salary: listing.salary_text,
            salary_amount: listing.salary_amount,
            currency: listing.salary_currency.map(|c| c.as_str().to_string()),
            published: listing.publish_date,
            link: listing.link,
            source: listing.source.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SourceOutcomeResponse {
    pub source: String,
    /// `ok`, `failed` or `skipped`.
    pub status: String,
    pub count: usize,
    pub error: Option<String>,
}

impl From<SourceOutcome> for SourceOutcomeResponse {
    fn from(outcome: SourceOutcome) -> Self {
        let status = match outcome.status {
            SourceStatus::Ok => "ok",
            SourceStatus::Failed => "failed",
            SourceStatus::Skipped => "skipped",
        };
        Self {
            source: outcome.source.to_string(),
            status: status.to_string(),
            count: outcome.count,
            error: outcome.error,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SearchReportResponse {
    pub listings: Vec<JobListingResponse>,
    pub sources: Vec<SourceOutcomeResponse>,
}

impl From<AggregateReport> for SearchReportResponse {
    fn from(report: AggregateReport) -> Self {
        Self {
            listings: report.listings.into_iter().map(Into::into).collect(),
            sources: report.outcomes.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use empleo_core::models::Source;

    use super::*;

    fn params(query: &str) -> SearchParams {
        serde_json::from_value(serde_json::Value::Object(
            url_pairs(query)
                .into_iter()
                .map(|(k, v)| (k, serde_json::Value::String(v)))
                .collect(),
        ))
        .unwrap()
    }

    fn url_pairs(query: &str) -> Vec<(String, String)> {
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_spanish_params_build_query() {
        let query = params("cargo=analista&distrito=Miraflores&sueldo_min=1500&experiencia=0&fuente=bumeran")
            .into_query()
            .unwrap();
        assert_eq!(query.title, "analista");
        assert_eq!(query.district, "Miraflores");
        assert_eq!(query.salary_min, Some(1500));
        assert_eq!(query.experience_years, Some(0));
        assert_eq!(query.sources, SourceSelection::Only(Source::Bumeran));
    }

    #[test]
    fn test_english_aliases_and_blank_numbers() {
        let query = params("title=dev&salary_min=&salary_max=0&source=all")
            .into_query()
            .unwrap();
        assert_eq!(query.title, "dev");
        assert_eq!(query.salary_min, None);
        assert_eq!(query.salary_max, None);
        assert_eq!(query.sources, SourceSelection::All);
    }

    #[test]
    fn test_unknown_source_is_invalid_query() {
        let err = params("fuente=linkedin").into_query().unwrap_err();
        assert!(matches!(err, AppError::InvalidQuery(_)));
    }
}

//! Computrabajo adapter.
//!
//! Computrabajo encodes most filters in the URL, but the values it accepts
//! (experience and salary tokens) are only discoverable from the filter
//! sidebar of a rendered results page. The final URL is therefore negotiated
//! in phases before paginating through the results with the "next" link.

use std::sync::LazyLock;

use empleo_core::error::AppError;
use empleo_core::filter::salary_matches;
use empleo_core::models::{JobListing, SearchQuery, Source, UNSPECIFIED};
use empleo_core::negotiation::{Phase, SearchState, negotiate};
use empleo_core::normalize::{
    computrabajo_district_slug, is_blank_or, normalize_date, parse_salary, resolve_location,
    slugify,
};
use empleo_core::traits::{JobSource, PageFetcher, PageSession};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::html::{Strategy, child_text, element_text, first_match};

pub const COMPUTRABAJO_BASE_URL: &str = "https://pe.computrabajo.com";

const NEXT_PAGE: &str = "a[title='Siguiente']";

/// Company lookups, most specific first.
const COMPANY_STRATEGIES: &[Strategy] = &[
    Strategy::new("[data-company]", "data-company"),
    Strategy::new(".fc_base[data-at]", "data-company"),
    Strategy::new("p.fs16.fc_base", "data-company"),
    Strategy::new(".empresa_title a", "data-company"),
    Strategy::new("a.it-blank", "data-company"),
];

static OFFER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article.box_offer").expect("valid offer selector"));
static TITLE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.js-o-link").expect("valid title selector"));
static LOCATION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".js-job-location").expect("valid location selector"));
static SALARY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".salary").expect("valid salary selector"));
static DATE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p.fs13").expect("valid date selector"));
static FILTER_GROUP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.field_select_links").expect("valid filter selector"));
static FILTER_HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid heading selector"));
static FILTER_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));
static FILTER_OPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("ul.list li span.buildLink[data-path]").expect("valid option selector")
});
static SALARY_OPTION: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("span.buildLink[data-path^='?sal=']").expect("valid salary option selector")
});

static SALARY_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"s/\.?\s*[\d,]+\.?\d*").expect("valid salary text regex"));

/// Computrabajo (pe.computrabajo.com) job source.
#[derive(Clone)]
pub struct ComputrabajoSource<F> {
    fetcher: F,
    base_url: String,
}

impl<F: PageFetcher> ComputrabajoSource<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            base_url: COMPUTRABAJO_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Search URL before any filter negotiation.
    pub fn search_url(&self, query: &SearchQuery) -> String {
        let mut url = format!("{}/trabajo", self.base_url);
        let title = slugify(&query.title);
        if !title.is_empty() {
            url.push_str("-de-");
            url.push_str(&title);
        }
        url.push_str("-en-lima-en-");
        url.push_str(&computrabajo_district_slug(&query.district));
        url
    }

    fn phases(query: &SearchQuery, base: &Url) -> Vec<Box<dyn Phase>> {
        let mut phases: Vec<Box<dyn Phase>> = Vec::new();
        if let Some(years) = query.experience_years {
            phases.push(Box::new(ExperiencePhase {
                years,
                base: base.clone(),
            }));
        }
        if let Some(schedule) = query.schedule.as_deref().map(slugify).filter(|s| !s.is_empty()) {
            phases.push(Box::new(SchedulePhase { slug: schedule }));
        }
        if let Some(min) = query.salary_min {
            phases.push(Box::new(SalaryPhase { min }));
        }
        phases
    }

    async fn run(
        &self,
        session: &mut F::Session,
        base: &Url,
        query: &SearchQuery,
        max_pages: usize,
    ) -> Vec<JobListing> {
        let start = SearchState::new(self.search_url(query));
        let state = negotiate(session, start, &Self::phases(query, base)).await;
        tracing::info!(url = %state.url, "Computrabajo search URL negotiated");

        let mut listings = Vec::new();
        if let Err(e) = session.navigate(&state.url).await {
            tracing::warn!(url = %state.url, error = %e, "Computrabajo results did not load");
            return listings;
        }

        for page in 1..=max_pages {
            let markup = match session.content().await {
                Ok(markup) => markup,
                Err(e) => {
                    tracing::warn!(page, error = %e, "Could not read Computrabajo page");
                    break;
                }
            };

            let (total, found) = parse_results(&markup, base, &query.district);
            if total == 0 {
                tracing::debug!(page, "No Computrabajo offers on page");
                break;
            }
            let before = listings.len();
            listings.extend(
                found
                    .into_iter()
                    .filter(|listing| salary_matches(query, listing.salary_amount)),
            );
            tracing::debug!(page, total, kept = listings.len() - before, "Computrabajo page parsed");

            if page < max_pages
                && let Err(e) = session.click(NEXT_PAGE).await
            {
                tracing::debug!(page, error = %e, "No further Computrabajo pages");
                break;
            }
        }

        listings
    }
}

impl<F: PageFetcher> JobSource for ComputrabajoSource<F> {
    fn source(&self) -> Source {
        Source::Computrabajo
    }

    async fn search(
        &self,
        query: &SearchQuery,
        max_pages: usize,
    ) -> Result<Vec<JobListing>, AppError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid Computrabajo base URL: {e}")))?;

        let mut session = self.fetcher.open().await?;
        let listings = self.run(&mut session, &base, query, max_pages).await;
        session.close().await;
        Ok(listings)
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Every well-formed offer on a results page, in page order.
///
/// Offers without a title link are skipped. Links are resolved against
/// `base`.
pub fn extract_listings(markup: &str, base: &Url, requested_district: &str) -> Vec<JobListing> {
    parse_results(markup, base, requested_district).1
}

/// Number of offer cards on the page plus the listings built from them.
fn parse_results(markup: &str, base: &Url, requested_district: &str) -> (usize, Vec<JobListing>) {
    let doc = Html::parse_document(markup);
    let offers: Vec<_> = doc.select(&OFFER).collect();
    let listings = offers
        .iter()
        .filter_map(|&offer| extract_offer(offer, base, requested_district))
        .collect();
    (offers.len(), listings)
}

fn extract_offer(offer: ElementRef<'_>, base: &Url, requested_district: &str) -> Option<JobListing> {
    let title_link = offer.select(&TITLE_LINK).next()?;
    // A missing or unjoinable href still yields an absolute link.
    let href = title_link.value().attr("href").unwrap_or_default();
    let link = base.join(href.trim()).unwrap_or_else(|_| base.clone());

    let title = Some(element_text(title_link))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNSPECIFIED.to_string());
    let company = first_match(offer, COMPANY_STRATEGIES, &["confidencial"])
        .unwrap_or_else(|| UNSPECIFIED.to_string());
    let location = child_text(offer, &LOCATION);
    let salary_text = extract_salary(offer);
    let (salary_amount, salary_currency) = parse_salary(&salary_text);
    let date = child_text(offer, &DATE);

    Some(JobListing {
        title,
        company,
        district: resolve_location(location.as_deref(), requested_district),
        salary_text,
        salary_amount,
        salary_currency,
        publish_date: normalize_date(date.as_deref()),
        link: link.to_string(),
        source: Source::Computrabajo,
    })
}

/// The `.salary` badge when it has a value, else a soles amount found
/// anywhere in the card.
fn extract_salary(offer: ElementRef<'_>) -> String {
    if let Some(badge) = child_text(offer, &SALARY)
        && !is_blank_or(&badge, &[])
    {
        return badge;
    }

    let text = offer.text().collect::<Vec<_>>().join(" ").to_lowercase();
    match SALARY_IN_TEXT.find(&text) {
        Some(m) => m.as_str().to_uppercase().replace(' ', ""),
        None => UNSPECIFIED.to_string(),
    }
}

// ---------------------------------------------------------------------------
// URL negotiation phases
// ---------------------------------------------------------------------------

/// The sidebar filter group whose heading mentions `keyword`.
fn filter_group<'a>(doc: &'a Html, keyword: &str) -> Option<ElementRef<'a>> {
    doc.select(&FILTER_GROUP).find(|group| {
        group
            .select(&FILTER_HEADING)
            .any(|p| element_text(p).to_lowercase().contains(keyword))
    })
}

/// Resolves the experience filter through the sidebar links.
struct ExperiencePhase {
    years: u32,
    base: Url,
}

impl ExperiencePhase {
    fn label(&self) -> &'static str {
        match self.years {
            0 => "Sin Experiencia",
            1 => "1 año",
            2 => "2 años",
            _ => "3-4 años",
        }
    }
}

impl Phase for ExperiencePhase {
    fn name(&self) -> &'static str {
        "experience"
    }

    fn needs_page(&self) -> bool {
        true
    }

    fn apply(&self, mut state: SearchState, page: Option<&str>) -> SearchState {
        let Some(page) = page else {
            return state;
        };
        let doc = Html::parse_document(page);
        let Some(group) = filter_group(&doc, "experiencia") else {
            tracing::debug!("No experience filter on page");
            return state;
        };
        let label = self.label();

        if self.years == 0 {
            let href = group
                .select(&FILTER_ANCHOR)
                .filter(|a| element_text(*a).contains(label))
                .filter_map(|a| a.value().attr("href"))
                .find(|href| href.starts_with('/'));
            if let Some(url) = href.and_then(|h| self.base.join(h).ok()) {
                state.url = url.to_string();
                state.experience_token = Some(label.to_string());
            }
            return state;
        }

        let token = group
            .select(&FILTER_OPTION)
            .filter(|span| element_text(*span) == label)
            .filter_map(|span| span.value().attr("data-path"))
            .find_map(|path| path.strip_prefix("?iex="))
            .map(str::to_string);
        if let Some(token) = token {
            state.append_param("iex", &token);
            state.experience_token = Some(token);
        }
        state
    }
}

/// Adds the schedule segment to the path.
struct SchedulePhase {
    slug: String,
}

impl Phase for SchedulePhase {
    fn name(&self) -> &'static str {
        "schedule"
    }

    fn apply(&self, mut state: SearchState, _page: Option<&str>) -> SearchState {
        if !state.path().contains("-jornada-") {
            state.push_path_suffix(&format!("-jornada-{}", self.slug));
        }
        state
    }
}

/// Narrows results to the highest salary bracket not above the minimum.
///
/// Brackets are coarse; the post-filter still checks every listing.
struct SalaryPhase {
    min: u64,
}

impl Phase for SalaryPhase {
    fn name(&self) -> &'static str {
        "salary"
    }

    fn needs_page(&self) -> bool {
        true
    }

    fn apply(&self, mut state: SearchState, page: Option<&str>) -> SearchState {
        let Some(page) = page else {
            return state;
        };
        let doc = Html::parse_document(page);
        let Some(group) = filter_group(&doc, "salario") else {
            tracing::debug!("No salary filter on page");
            return state;
        };

        let best = group
            .select(&SALARY_OPTION)
            .filter_map(|span| {
                let token = span.value().attr("data-path")?.strip_prefix("?sal=")?;
                let (amount, _) = parse_salary(&element_text(span));
                amount
                    .filter(|&a| a <= self.min)
                    .map(|a| (a, token.to_string()))
            })
            .max_by_key(|(amount, _)| *amount);

        if let Some((_, token)) = best {
            state.append_param("sal", &token);
            state.salary_token = Some(token);
        }
        state
    }
}

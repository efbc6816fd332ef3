//! Bumeran adapter.
//!
//! Bumeran's result cards carry title, company and date, but salary and
//! required experience only appear on each posting's detail page. Every card
//! therefore costs one extra fetch, run through a small ordered pool.

use std::sync::LazyLock;
use std::time::Duration;

use empleo_core::error::AppError;
use empleo_core::filter::{experience_matches, salary_matches};
use empleo_core::models::{JobListing, SearchQuery, Source, UNSPECIFIED};
use empleo_core::normalize::{
    bumeran_district_slug, district_label, normalize_date, parse_salary, slugify,
};
use empleo_core::traits::{JobSource, PageFetcher, PageSession};
use futures::StreamExt;
use futures::stream;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::html::{child_text, collapse_whitespace, element_text};

pub const BUMERAN_BASE_URL: &str = "https://www.bumeran.com.pe";

/// Detail pages fetched at once.
pub const DEFAULT_DETAIL_CONCURRENCY: usize = 4;

const RESULTS_CONTAINER: &str = "#listado-avisos";
const RESULTS_WAIT: Duration = Duration::from_secs(15);

static JOB_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a[href^='/empleos/'][target='_blank']").expect("valid job link selector")
});
static CARD_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2").expect("valid title selector"));
static CARD_COMPANY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3").expect("valid company selector"));
static DETAIL_ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("valid item selector"));
static DETAIL_VALUE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("valid value selector"));

static DATE_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)hace|publicado").expect("valid date text regex"));
static YEARS_REQUIRED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*añ(?:o|os)").expect("valid experience regex"));

/// What a result card shows before opening the posting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub link: String,
    pub title: String,
    pub company: String,
    pub date: Option<String>,
}

/// Fields only available on the posting's own page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detail {
    pub salary_text: String,
    /// `Some(0)` when the posting says no experience is needed.
    pub experience_years: Option<u32>,
}

/// Bumeran (bumeran.com.pe) job source.
#[derive(Clone)]
pub struct BumeranSource<F> {
    fetcher: F,
    base_url: String,
    detail_concurrency: usize,
    results_wait: Duration,
}

impl<F: PageFetcher> BumeranSource<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            base_url: BUMERAN_BASE_URL.to_string(),
            detail_concurrency: DEFAULT_DETAIL_CONCURRENCY,
            results_wait: RESULTS_WAIT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_detail_concurrency(mut self, concurrency: usize) -> Self {
        self.detail_concurrency = concurrency.max(1);
        self
    }

    /// How long to wait for the result list to render.
    pub fn with_results_wait(mut self, wait: Duration) -> Self {
        self.results_wait = wait;
        self
    }

    /// URL of result page `page` (1-based).
    pub fn search_url(&self, query: &SearchQuery, page: usize) -> String {
        let title = slugify(&query.title);
        let district = bumeran_district_slug(&query.district);
        let mut url = if district.is_empty() {
            format!("{}/empleos-busqueda-{title}.html", self.base_url)
        } else {
            format!("{}/en-lima/{district}/empleos-busqueda-{title}.html", self.base_url)
        };
        if page > 1 {
            url.push_str(&format!("?page={page}"));
        }
        url
    }

    async fn run(
        &self,
        session: &mut F::Session,
        base: &Url,
        query: &SearchQuery,
        max_pages: usize,
    ) -> Vec<JobListing> {
        let district = district_label(&query.district);
        let mut listings = Vec::new();

        for page in 1..=max_pages {
            let url = self.search_url(query, page);
            let markup = match self.load_results(session, &url).await {
                Ok(markup) => markup,
                Err(e) => {
                    tracing::debug!(page, url = %url, error = %e, "No further Bumeran results");
                    break;
                }
            };

            let cards = extract_cards(&markup, base);
            if cards.is_empty() {
                tracing::debug!(page, "No Bumeran postings on page");
                break;
            }
            let total = cards.len();

            let pending: Vec<_> = cards.into_iter().map(|card| self.resolve_card(card)).collect();
            let resolved: Vec<_> = stream::iter(pending)
                .buffered(self.detail_concurrency)
                .collect()
                .await;

            let before = listings.len();
            for (card, detail) in resolved {
                match detail {
                    Ok(detail) => {
                        if let Some(listing) = build_listing(card, detail, query, &district) {
                            listings.push(listing);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(link = %card.link, error = %e, "Skipping Bumeran posting");
                    }
                }
            }
            tracing::debug!(page, total, kept = listings.len() - before, "Bumeran page parsed");
        }

        listings
    }

    async fn load_results(&self, session: &mut F::Session, url: &str) -> Result<String, AppError> {
        session.navigate(url).await?;
        session.wait_for(RESULTS_CONTAINER, self.results_wait).await?;
        session.content().await
    }

    async fn resolve_card(&self, card: Card) -> (Card, Result<Detail, AppError>) {
        let detail = self.fetch_detail(&card.link).await;
        (card, detail)
    }

    /// Open a fresh session for one posting; it is closed whatever happens.
    async fn fetch_detail(&self, link: &str) -> Result<Detail, AppError> {
        let mut session = self.fetcher.open().await?;
        let markup = match session.navigate(link).await {
            Ok(()) => session.content().await,
            Err(e) => Err(e),
        };
        session.close().await;
        Ok(extract_detail(&markup?))
    }
}

impl<F: PageFetcher> JobSource for BumeranSource<F> {
    fn source(&self) -> Source {
        Source::Bumeran
    }

    async fn search(
        &self,
        query: &SearchQuery,
        max_pages: usize,
    ) -> Result<Vec<JobListing>, AppError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| AppError::ConfigError(format!("Invalid Bumeran base URL: {e}")))?;

        let mut session = self.fetcher.open().await?;
        let listings = self.run(&mut session, &base, query, max_pages).await;
        session.close().await;
        Ok(listings)
    }
}

fn build_listing(
    card: Card,
    detail: Detail,
    query: &SearchQuery,
    district: &str,
) -> Option<JobListing> {
    let (salary_amount, salary_currency) = parse_salary(&detail.salary_text);
    if !salary_matches(query, salary_amount) || !experience_matches(query, detail.experience_years)
    {
        return None;
    }

    Some(JobListing {
        title: card.title,
        company: card.company,
        district: district.to_string(),
        salary_text: detail.salary_text,
        salary_amount,
        salary_currency,
        publish_date: normalize_date(card.date.as_deref()),
        link: card.link,
        source: Source::Bumeran,
    })
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Result cards on a listing page, in page order.
pub fn extract_cards(markup: &str, base: &Url) -> Vec<Card> {
    let doc = Html::parse_document(markup);
    doc.select(&JOB_LINK)
        .filter_map(|link| {
            let href = link.value().attr("href")?;
            let absolute = base.join(href.trim()).ok()?;
            Some(read_card(link, absolute.to_string()))
        })
        .collect()
}

fn read_card(link: ElementRef<'_>, absolute: String) -> Card {
    let card = link
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div");

    let field = |sel: &Selector| {
        card.and_then(|c| child_text(c, sel))
            .unwrap_or_else(|| UNSPECIFIED.to_string())
    };
    let date = card.and_then(|c| {
        c.text()
            .find(|t| DATE_TEXT.is_match(t))
            .map(collapse_whitespace)
    });

    Card {
        link: absolute,
        title: field(&CARD_TITLE),
        company: field(&CARD_COMPANY),
        date,
    }
}

/// Salary and experience from a posting page.
pub fn extract_detail(markup: &str) -> Detail {
    let doc = Html::parse_document(markup);

    let salary_text = doc
        .select(&DETAIL_ITEM)
        .find(|li| li.inner_html().contains("icon-light-money"))
        .and_then(|li| child_text(li, &DETAIL_VALUE))
        .unwrap_or_else(|| UNSPECIFIED.to_string());

    let body = element_text(doc.root_element()).to_lowercase();
    let experience_years = if body.contains("sin experiencia") {
        Some(0)
    } else {
        YEARS_REQUIRED
            .captures(&body)
            .and_then(|caps| caps[1].parse().ok())
    };

    Detail {
        salary_text,
        experience_years,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use empleo_core::models::Currency;
    use empleo_core::testutil::MockFetcher;
    use empleo_core::throttle::{ThrottleConfig, ThrottledFetcher};

    const SEARCH: &str = "https://www.bumeran.com.pe/empleos-busqueda-analista.html";
    const LINK_A: &str = "https://www.bumeran.com.pe/empleos/analista-de-datos-1111.html";
    const LINK_B: &str = "https://www.bumeran.com.pe/empleos/analista-junior-2222.html";
    const LINK_C: &str = "https://www.bumeran.com.pe/empleos/analista-senior-3333.html";

    const LISTING: &str = r#"
        <html><body><div id="listado-avisos">
            <div class="aviso">
                <a href="/empleos/analista-de-datos-1111.html" target="_blank"><h2>Analista de Datos</h2></a>
                <h3>Banco Andino</h3>
                <span>Publicado hace 2 días</span>
            </div>
            <div class="aviso">
                <a href="/empleos/analista-junior-2222.html" target="_blank"><h2>Analista Junior</h2></a>
                <h3>Retail Norte</h3>
                <span>Publicado ayer</span>
            </div>
            <div class="aviso">
                <a href="/empleos/analista-senior-3333.html" target="_blank"><h2>Analista Senior</h2></a>
            </div>
            <a href="/empleos/ignorado.html">same tab, not a posting card</a>
        </div></body></html>"#;

    const DETAIL_A: &str = r#"
        <html><body><ul>
            <li><i class="icon-light-location"></i><p>Lima, Perú</p></li>
            <li><i class="icon-light-money"></i><p>S/ 3,000 - S/ 3,500</p></li>
        </ul><p>Requisitos: 2 años de experiencia en SQL</p></body></html>"#;

    const DETAIL_B: &str = r#"
        <html><body><ul><li><i class="icon-light-location"></i><p>Lima</p></li></ul>
        <p>Puesto sin experiencia, te capacitamos.</p></body></html>"#;

    fn base() -> Url {
        Url::parse(BUMERAN_BASE_URL).unwrap()
    }

    fn fixture() -> MockFetcher {
        MockFetcher::new()
            .with_page(SEARCH, LISTING)
            .with_page(LINK_A, DETAIL_A)
            .with_page(LINK_B, DETAIL_B)
            .with_page(LINK_C, DETAIL_B)
    }

    #[test]
    fn test_search_url_shapes() {
        let source = BumeranSource::new(MockFetcher::new());
        assert_eq!(source.search_url(&SearchQuery::new("Analista"), 1), SEARCH);
        assert_eq!(
            source.search_url(&SearchQuery::new("analista").with_district("Lima"), 2),
            format!("{SEARCH}?page=2")
        );
        assert_eq!(
            source.search_url(&SearchQuery::new("analista").with_district("San Isidro"), 1),
            "https://www.bumeran.com.pe/en-lima/san-isidro/empleos-busqueda-analista.html"
        );
    }

    #[test]
    fn test_extract_cards() {
        let cards = extract_cards(LISTING, &base());
        assert_eq!(cards.len(), 3);
        assert_eq!(
            cards[0],
            Card {
                link: LINK_A.to_string(),
                title: "Analista de Datos".to_string(),
                company: "Banco Andino".to_string(),
                date: Some("Publicado hace 2 días".to_string()),
            }
        );
        assert_eq!(cards[2].company, UNSPECIFIED);
        assert_eq!(cards[2].date, None);
    }

    #[test]
    fn test_extract_detail() {
        assert_eq!(
            extract_detail(DETAIL_A),
            Detail {
                salary_text: "S/ 3,000 - S/ 3,500".to_string(),
                experience_years: Some(2),
            }
        );
        assert_eq!(
            extract_detail(DETAIL_B),
            Detail {
                salary_text: UNSPECIFIED.to_string(),
                experience_years: Some(0),
            }
        );
        assert_eq!(extract_detail("<p>Buen clima laboral</p>").experience_years, None);
    }

    #[tokio::test]
    async fn test_search_without_filters_keeps_card_order() {
        let fetcher = fixture();
        let source = BumeranSource::new(fetcher.clone());

        let listings = source.search(&SearchQuery::new("analista"), 1).await.unwrap();

        let links: Vec<_> = listings.iter().map(|l| l.link.as_str()).collect();
        assert_eq!(links, vec![LINK_A, LINK_B, LINK_C]);

        let first = &listings[0];
        assert_eq!(first.salary_amount, Some(3000));
        assert_eq!(first.salary_currency, Some(Currency::Pen));
        assert_eq!(first.publish_date, "Hace 2 días");
        assert_eq!(first.district, "Lima");
        assert_eq!(listings[1].publish_date, "Ayer");
        assert_eq!(listings[2].publish_date, "Hoy");

        assert_eq!(fetcher.sessions_opened(), 4);
        assert_eq!(fetcher.sessions_closed(), 4);
    }

    #[tokio::test]
    async fn test_salary_bound_drops_unknown_salaries() {
        let source = BumeranSource::new(fixture());
        let query = SearchQuery::new("analista").with_salary_min(Some(2000));

        let listings = source.search(&query, 1).await.unwrap();

        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].link, LINK_A);
    }

    #[tokio::test]
    async fn test_experience_filter() {
        let source = BumeranSource::new(fixture());

        let none_needed = SearchQuery::new("analista").with_experience(Some(0));
        let links: Vec<_> = source
            .search(&none_needed, 1)
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.link)
            .collect();
        assert_eq!(links, vec![LINK_B.to_string(), LINK_C.to_string()]);

        let two_years = SearchQuery::new("analista").with_experience(Some(2));
        let listings = source.search(&two_years, 1).await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].link, LINK_A);

        let three_years = SearchQuery::new("analista").with_experience(Some(3));
        assert!(source.search(&three_years, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_detail_drops_only_that_posting() {
        let fetcher = fixture().with_error(LINK_B, AppError::Timeout(30));
        let source = BumeranSource::new(fetcher.clone()).with_detail_concurrency(2);

        let listings = source.search(&SearchQuery::new("analista"), 1).await.unwrap();

        let links: Vec<_> = listings.iter().map(|l| l.link.as_str()).collect();
        assert_eq!(links, vec![LINK_A, LINK_C]);
        assert_eq!(fetcher.sessions_closed(), fetcher.sessions_opened());
    }

    #[tokio::test]
    async fn test_cancelled_search_releases_detail_sessions() {
        let fetcher = fixture();
        let throttled = ThrottledFetcher::new(
            fetcher.clone(),
            ThrottleConfig::new(Duration::from_millis(500)),
        );
        let source = BumeranSource::new(throttled);

        let query = SearchQuery::new("analista");
        let outcome = tokio::time::timeout(Duration::from_millis(100), source.search(&query, 1)).await;

        assert!(outcome.is_err(), "detail fetches should still be throttled");
        assert!(fetcher.sessions_opened() > 1);
        assert_eq!(fetcher.sessions_released(), fetcher.sessions_opened());
    }

    #[tokio::test]
    async fn test_unrendered_results_stop_search() {
        let fetcher = MockFetcher::new().with_unrendered_page(SEARCH, "<html></html>");
        let source = BumeranSource::new(fetcher.clone());

        let listings = source.search(&SearchQuery::new("analista"), 3).await.unwrap();

        assert!(listings.is_empty());
        assert_eq!(fetcher.navigations(), vec![SEARCH.to_string()]);
        assert_eq!(fetcher.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn test_pagination_stops_at_max_pages() {
        let fetcher = MockFetcher::new().with_fallback(LISTING);
        let source = BumeranSource::new(fetcher.clone());

        let listings = source.search(&SearchQuery::new("analista"), 2).await.unwrap();

        assert_eq!(listings.len(), 6);
        let navigations = fetcher.navigations();
        assert!(navigations.contains(&format!("{SEARCH}?page=2")));
        assert!(!navigations.iter().any(|url| url.ends_with("?page=3")));
    }

    #[tokio::test]
    async fn test_open_failure_is_source_error() {
        let source = BumeranSource::new(MockFetcher::new().with_open_error("Failed to launch"));
        assert!(source.search(&SearchQuery::new("x"), 1).await.is_err());
    }
}

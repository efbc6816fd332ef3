use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::models::{JobListing, SearchQuery, Source};
use crate::traits::JobSource;

/// Default number of result pages each source is asked for.
pub const DEFAULT_MAX_PAGES: usize = 3;

/// How one source fared during an aggregate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Ok,
    Failed,
    /// Not requested by the query.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceOutcome {
    pub source: Source,
    pub status: SourceStatus,
    pub count: usize,
    pub error: Option<String>,
}

/// Merged listings plus one outcome per known source, in source order.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateReport {
    pub listings: Vec<JobListing>,
    pub outcomes: Vec<SourceOutcome>,
}

/// Runs every requested source and merges their listings.
///
/// Sources run concurrently but are merged in fixed order: Computrabajo
/// first, then Bumeran, each preserving its own extraction order. A source
/// that errors (or panics) contributes nothing; it never fails the search.
pub struct Aggregator<C, B>
where
    C: JobSource,
    B: JobSource,
{
    computrabajo: C,
    bumeran: B,
    max_pages: usize,
}

impl<C, B> Aggregator<C, B>
where
    C: JobSource,
    B: JobSource,
{
    pub fn new(computrabajo: C, bumeran: B) -> Self {
        Self {
            computrabajo,
            bumeran,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Merged listings for `query`.
    pub async fn aggregate(&self, query: &SearchQuery) -> Vec<JobListing> {
        self.run(query).await.listings
    }

    /// Merged listings plus per-source status.
    pub async fn run(&self, query: &SearchQuery) -> AggregateReport {
        let search_id = Uuid::new_v4();
        let span = tracing::info_span!("search", %search_id);

        async {
            tracing::info!(
                title = %query.title,
                district = %query.district,
                salary_min = ?query.salary_min,
                salary_max = ?query.salary_max,
                experience = ?query.experience_years,
                schedule = ?query.schedule,
                "Search started"
            );

            let (first, second) = tokio::join!(
                run_source(&self.computrabajo, query, self.max_pages),
                run_source(&self.bumeran, query, self.max_pages),
            );

            let mut listings = Vec::new();
            let mut outcomes = Vec::with_capacity(2);
            for (outcome, found) in [first, second] {
                listings.extend(found);
                outcomes.push(outcome);
            }

            tracing::info!(total = listings.len(), "Search completed");
            AggregateReport { listings, outcomes }
        }
        .instrument(span)
        .await
    }
}

async fn run_source<S: JobSource>(
    adapter: &S,
    query: &SearchQuery,
    max_pages: usize,
) -> (SourceOutcome, Vec<JobListing>) {
    let source = adapter.source();
    if !query.sources.includes(source) {
        let outcome = SourceOutcome {
            source,
            status: SourceStatus::Skipped,
            count: 0,
            error: None,
        };
        return (outcome, Vec::new());
    }

    tracing::info!(%source, "Querying source");
    let result = AssertUnwindSafe(adapter.search(query, max_pages))
        .catch_unwind()
        .await;

    match result {
        Ok(Ok(mut listings)) => {
            for listing in &mut listings {
                listing.source = source;
            }
            tracing::info!(%source, count = listings.len(), "Source finished");
            let outcome = SourceOutcome {
                source,
                status: SourceStatus::Ok,
                count: listings.len(),
                error: None,
            };
            (outcome, listings)
        }
        Ok(Err(e)) => {
            tracing::warn!(%source, error = %e, "Source failed, contributing no listings");
            (failed(source, e.to_string()), Vec::new())
        }
        Err(_) => {
            tracing::error!(%source, "Source panicked, contributing no listings");
            (failed(source, "adapter panicked".to_string()), Vec::new())
        }
    }
}

fn failed(source: Source, error: String) -> SourceOutcome {
    SourceOutcome {
        source,
        status: SourceStatus::Failed,
        count: 0,
        error: Some(error),
    }
}

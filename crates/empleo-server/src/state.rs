use std::sync::Arc;

use futures::future::BoxFuture;

use empleo_core::aggregate::{AggregateReport, Aggregator};
use empleo_core::models::SearchQuery;
use empleo_core::traits::JobSource;

/// Runs one aggregated search.
///
/// Object-safe front for [`Aggregator`], whose source types are generic, so
/// the router does not need to be.
pub trait Searcher: Send + Sync {
    fn search(&self, query: SearchQuery) -> BoxFuture<'_, AggregateReport>;
}

impl<C, B> Searcher for Aggregator<C, B>
where
    C: JobSource,
    B: JobSource,
{
    fn search(&self, query: SearchQuery) -> BoxFuture<'_, AggregateReport> {
        Box::pin(async move { self.run(&query).await })
    }
}

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub searcher: Arc<dyn Searcher>,
}

impl AppState {
    pub fn new(searcher: impl Searcher + 'static) -> Self {
        Self {
            searcher: Arc::new(searcher),
        }
    }
}

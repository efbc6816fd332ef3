pub mod aggregate;
pub mod error;
pub mod filter;
pub mod models;
pub mod negotiation;
pub mod normalize;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
pub mod throttle;
pub mod traits;

pub use aggregate::{AggregateReport, Aggregator, DEFAULT_MAX_PAGES, SourceOutcome, SourceStatus};
pub use error::AppError;
pub use models::{Currency, JobListing, SearchQuery, Source, SourceSelection};
pub use negotiation::{Phase, SearchState, negotiate};
pub use throttle::{ThrottleConfig, ThrottledFetcher};
pub use traits::{JobSource, PageFetcher, PageSession};

/// Smoke-test for `BrowserFetcher` against the live Bumeran site.
///
/// Launches a headless Chromium, runs a one-page Bumeran search and prints
/// what came back.
///
/// Run with:
///   cargo run -p empleo-client --example browser_smoke --features browser
use empleo_client::{BrowserFetcher, BumeranSource};
use empleo_core::models::SearchQuery;
use empleo_core::traits::JobSource;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Launching headless browser...");
    let fetcher = BrowserFetcher::new().await?;
    let source = BumeranSource::new(fetcher).with_detail_concurrency(2);

    let query = SearchQuery::new("analista");
    let listings = source.search(&query, 1).await?;

    anyhow::ensure!(!listings.is_empty(), "Bumeran returned no postings");
    assert!(listings.iter().all(|l| l.link.starts_with("https://")));

    println!("OK, got {} postings", listings.len());
    for listing in listings.iter().take(5) {
        println!("{} | {} | {}", listing.title, listing.company, listing.salary_text);
    }
    Ok(())
}

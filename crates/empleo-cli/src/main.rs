use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use empleo_client::{BumeranSource, ComputrabajoSource, HttpFetcher};
use empleo_core::aggregate::{AggregateReport, Aggregator, DEFAULT_MAX_PAGES, SourceStatus};
use empleo_core::models::{JobListing, SearchQuery, SourceSelection};
use empleo_core::throttle::{ThrottleConfig, ThrottledFetcher};
use empleo_core::traits::PageFetcher;

#[derive(Parser)]
#[command(name = "empleo", version, about = "Job listings from Computrabajo and Bumeran")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search both job boards and print the merged listings
    Search(SearchArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// Job title to search for
    #[arg(short, long, default_value = "")]
    title: String,

    /// District within Lima (defaults to all of Lima)
    #[arg(short, long, default_value = "")]
    district: String,

    /// Minimum monthly salary (0 = no bound)
    #[arg(long)]
    salary_min: Option<u64>,

    /// Maximum monthly salary (0 = no bound)
    #[arg(long)]
    salary_max: Option<u64>,

    /// Years of experience; 0 keeps postings that need none
    #[arg(short, long)]
    experience: Option<u32>,

    /// Schedule, e.g. "tiempo completo"
    #[arg(long)]
    schedule: Option<String>,

    /// Which job board to query: all, computrabajo or bumeran
    #[arg(short, long, default_value = "all")]
    source: SourceSelection,

    /// Result pages to read per job board
    #[arg(long, env = "EMPLEO_MAX_PAGES", default_value_t = DEFAULT_MAX_PAGES)]
    max_pages: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Render pages in headless Chromium instead of plain HTTP
    #[arg(long, default_value_t = false)]
    browser: bool,

    /// Minimum delay between requests to one host, in milliseconds
    #[arg(long, env = "EMPLEO_THROTTLE_MS", default_value_t = 0)]
    throttle_ms: u64,

    /// Page load timeout in seconds
    #[arg(long, env = "EMPLEO_FETCH_TIMEOUT_SECS", default_value_t = 30)]
    timeout: u64,

    /// Bumeran detail pages fetched at once
    #[arg(long, env = "EMPLEO_DETAIL_CONCURRENCY", default_value_t = 4)]
    detail_concurrency: usize,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

impl SearchArgs {
    fn to_query(&self) -> SearchQuery {
        SearchQuery::new(self.title.trim())
            .with_district(self.district.trim())
            .with_salary_min(self.salary_min)
            .with_salary_max(self.salary_max)
            .with_experience(self.experience)
            .with_schedule(self.schedule.clone())
            .with_sources(self.source)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("empleo=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search(args) => cmd_search(&args).await?,
    }

    Ok(())
}

async fn cmd_search(args: &SearchArgs) -> Result<()> {
    let timeout = Duration::from_secs(args.timeout);
    let report = if args.browser {
        search_with_browser(args, timeout).await?
    } else {
        let fetcher = HttpFetcher::with_timeout(timeout).context("Failed to create HTTP client")?;
        search(fetcher, args).await
    };

    for outcome in &report.outcomes {
        if outcome.status == SourceStatus::Failed {
            tracing::warn!(
                source = %outcome.source,
                error = outcome.error.as_deref().unwrap_or_default(),
                "Source returned no listings"
            );
        }
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(&report.listings)?)?;
        }
        OutputFormat::Csv => write_csv(&report.listings, &mut out)?,
    }

    Ok(())
}

async fn search<F: PageFetcher>(fetcher: F, args: &SearchArgs) -> AggregateReport {
    let fetcher = ThrottledFetcher::new(
        fetcher,
        ThrottleConfig::new(Duration::from_millis(args.throttle_ms)),
    );
    let aggregator = Aggregator::new(
        ComputrabajoSource::new(fetcher.clone()),
        BumeranSource::new(fetcher).with_detail_concurrency(args.detail_concurrency),
    )
    .with_max_pages(args.max_pages);

    aggregator.run(&args.to_query()).await
}

#[cfg(feature = "browser")]
async fn search_with_browser(args: &SearchArgs, timeout: Duration) -> Result<AggregateReport> {
    let fetcher = empleo_client::BrowserFetcher::with_timeout(timeout)
        .await
        .context("Failed to launch headless browser")?;
    Ok(search(fetcher, args).await)
}

#[cfg(not(feature = "browser"))]
async fn search_with_browser(_args: &SearchArgs, _timeout: Duration) -> Result<AggregateReport> {
    anyhow::bail!("--browser requires building with the `browser` feature")
}

/// One header row with the listing field labels, then one row per listing.
fn write_csv<W: Write>(listings: &[JobListing], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for listing in listings {
        wtr.serialize(listing)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use empleo_core::models::{Currency, Source};

    use super::*;

    fn parse(args: &[&str]) -> SearchArgs {
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Commands::Search(args) => args,
        }
    }

    #[test]
    fn test_search_args_build_query() {
        let args = parse(&[
            "empleo",
            "search",
            "--title",
            "analista de datos",
            "--district",
            "Miraflores",
            "--salary-min",
            "1500",
            "--salary-max",
            "0",
            "--experience",
            "0",
            "--source",
            "bumeran",
            "--format",
            "csv",
        ]);
        let query = args.to_query();

        assert_eq!(query.title, "analista de datos");
        assert_eq!(query.district, "Miraflores");
        assert_eq!(query.salary_min, Some(1500));
        assert_eq!(query.salary_max, None);
        assert_eq!(query.experience_years, Some(0));
        assert_eq!(query.sources, SourceSelection::Only(Source::Bumeran));
        assert!(args.format == OutputFormat::Csv);
    }

    #[test]
    fn test_unknown_source_is_rejected() {
        assert!(Cli::try_parse_from(["empleo", "search", "--source", "linkedin"]).is_err());
    }

    #[test]
    fn test_write_csv_uses_listing_labels() {
        let listing = JobListing {
            title: "Analista".to_string(),
            company: "ACME".to_string(),
            district: "Lima".to_string(),
            salary_text: "S/ 2,500".to_string(),
            salary_amount: Some(2500),
            salary_currency: Some(Currency::Pen),
            publish_date: "Hoy".to_string(),
            link: "https://pe.computrabajo.com/o/1".to_string(),
            source: Source::Computrabajo,
        };

        let mut buf = Vec::new();
        write_csv(&[listing], &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("Título,Empresa,Distrito,Salario,SalarioMonto,Moneda,Fecha publicación,Enlace,Fuente")
        );
        assert_eq!(
            lines.next(),
            Some("Analista,ACME,Lima,\"S/ 2,500\",2500,PEN,Hoy,https://pe.computrabajo.com/o/1,Computrabajo")
        );
    }
}

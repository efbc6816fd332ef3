use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use empleo_client::{BumeranSource, ComputrabajoSource, HttpFetcher};
use empleo_core::aggregate::Aggregator;
use empleo_core::throttle::{ThrottleConfig, ThrottledFetcher};
use empleo_core::traits::PageFetcher;
use empleo_server::config::{FetcherKind, ServerConfig};
use empleo_server::routes;
use empleo_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("empleo=info".parse()?))
        .with_target(false)
        .init();

    let config = ServerConfig::from_env()?;
    let addr = format!("0.0.0.0:{}", config.port);

    let state = match config.fetcher {
        FetcherKind::Http => app_state(HttpFetcher::with_timeout(config.fetch_timeout)?, &config),
        FetcherKind::Browser => browser_state(&config).await?,
    };

    let app = routes::router(Arc::new(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!(
        fetcher = ?config.fetcher,
        max_pages = config.max_pages,
        throttle_ms = config.throttle.as_millis() as u64,
        "Starting server on {addr}"
    );
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn app_state<F: PageFetcher + 'static>(fetcher: F, config: &ServerConfig) -> AppState {
    let fetcher = ThrottledFetcher::new(fetcher, ThrottleConfig::new(config.throttle));
    let aggregator = Aggregator::new(
        ComputrabajoSource::new(fetcher.clone()),
        BumeranSource::new(fetcher).with_detail_concurrency(config.detail_concurrency),
    )
    .with_max_pages(config.max_pages);
    AppState::new(aggregator)
}

#[cfg(feature = "browser")]
async fn browser_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let fetcher = empleo_client::BrowserFetcher::with_timeout(config.fetch_timeout).await?;
    Ok(app_state(fetcher, config))
}

#[cfg(not(feature = "browser"))]
async fn browser_state(_config: &ServerConfig) -> anyhow::Result<AppState> {
    anyhow::bail!("EMPLEO_FETCHER=browser requires building with the `browser` feature")
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    tracing::info!("Shutdown signal received");
}

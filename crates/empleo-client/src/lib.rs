#[cfg(feature = "browser")]
pub mod browser_fetcher;
pub mod bumeran;
pub mod computrabajo;
pub mod fetcher;
pub mod html;

#[cfg(feature = "browser")]
pub use browser_fetcher::BrowserFetcher;
pub use bumeran::BumeranSource;
pub use computrabajo::ComputrabajoSource;
pub use fetcher::HttpFetcher;

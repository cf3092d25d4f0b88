//! # pricegear-scrape
//!
//! Live price aggregation across Bangladeshi computer-hardware storefronts.
//!
//! One search term fans out to every registered storefront adapter
//! concurrently. Each adapter either fetches a static search page or has it
//! rendered in an isolated browser context, then extracts raw product
//! records. Records are normalised per storefront and merged into one
//! response grouped by storefront.
//!
//! ## Design
//!
//! - Per-adapter timeouts and panic isolation: a broken storefront only
//!   empties its own group
//! - An overall request deadline: latency is bounded by the deadline, not
//!   by the slowest storefront
//! - A bounded, shared browser session for script-rendered storefronts
//! - In-memory TTL cache keyed by the normalised search term
//! - Per-caller sliding-window admission limits for the expensive path
//!
//! ## Security
//!
//! - No network listeners; this is a library
//! - Search terms are logged only at trace level
//! - No cookies persist between fetches or between browser contexts

pub mod adapter;
pub mod adapters;
pub mod admission;
pub mod browser;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod runner;
pub mod service;
pub mod types;

pub use adapter::{AdapterKind, Extraction, PageLoader, RenderOptions, SourceAdapter, WaitUntil};
pub use admission::{Admission, AdmissionConfig, AdmissionLimiter, CallerId, OperationClass, Quota};
pub use browser::{BrowserSession, SessionStatus};
pub use cache::QueryCache;
pub use catalog::{catalog_rows, CatalogKey, CatalogRow};
pub use config::{BrowserConfig, ScrapeConfig};
pub use error::{Result, ScrapeError};
pub use runner::{AdapterRunner, RunOutcome, RunReport, RunnerConfig};
pub use service::{Aggregation, HealthReport, PriceAggregator};
pub use types::{AggregateResponse, Price, Product, RawRecord, SearchQuery, Source, SourceInfo, SourceResult};

/// Aggregate prices for `term` once, with a throwaway aggregator.
///
/// Convenient for scripts; long-running callers should keep a
/// [`PriceAggregator`] so the cache and browser session are reused.
///
/// # Errors
///
/// Returns [`ScrapeError::Config`] for an invalid `config` and
/// [`ScrapeError::InvalidQuery`] for a blank term.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> pricegear_scrape::Result<()> {
/// let config = pricegear_scrape::ScrapeConfig::default();
/// let response = pricegear_scrape::aggregate("gaming mouse", &config).await?;
/// for group in &response.results {
///     println!("{}: {} products", group.source, group.products.len());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn aggregate(term: &str, config: &ScrapeConfig) -> Result<AggregateResponse> {
    let aggregator = PriceAggregator::from_config(config)?;
    let response = aggregator.aggregate(term).await;
    aggregator.shutdown().await;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn aggregate_validates_config() {
        let config = ScrapeConfig {
            sources: vec![],
            ..Default::default()
        };
        let err = aggregate("mouse", &config).await.unwrap_err();
        assert!(err.to_string().contains("source"));
    }

    #[tokio::test]
    async fn aggregate_rejects_blank_term() {
        let err = aggregate(" \t ", &ScrapeConfig::default()).await.unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidQuery(_)));
    }
}

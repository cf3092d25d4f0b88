//! The aggregation façade: cache, admission, fan-out, normalisation.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::adapters;
use crate::admission::{AdmissionLimiter, CallerId, OperationClass};
use crate::browser::{BrowserSession, SessionStatus};
use crate::cache::QueryCache;
use crate::config::ScrapeConfig;
use crate::error::Result;
use crate::pipeline;
use crate::runner::{AdapterRunner, RunReport, RunnerConfig};
use crate::types::{AggregateResponse, SearchQuery};

/// A response together with how it was produced.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// The merged response.
    pub response: AggregateResponse,
    /// Fan-out report; `None` when served from cache.
    pub report: Option<RunReport>,
    /// Whether the response came from the cache.
    pub cached: bool,
}

/// Readiness snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Browser session state.
    pub browser: SessionStatus,
    /// Registered storefronts, in registration order.
    pub sources: Vec<String>,
    /// Live cache entries.
    pub cached_queries: u64,
}

/// Multi-storefront price aggregator.
///
/// Owns the adapter runner (and through it the browser session), the
/// query cache and the admission limiter. Cheap to share behind an `Arc`.
pub struct PriceAggregator {
    runner: AdapterRunner,
    cache: QueryCache,
    limiter: AdmissionLimiter,
}

impl PriceAggregator {
    /// Assemble an aggregator from parts.
    pub fn new(runner: AdapterRunner, cache: QueryCache, limiter: AdmissionLimiter) -> Self {
        Self {
            runner,
            cache,
            limiter,
        }
    }

    /// Build the production aggregator described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScrapeError::Config`] if the configuration is
    /// invalid, or [`crate::ScrapeError::Http`] if the HTTP client cannot
    /// be built.
    pub fn from_config(config: &ScrapeConfig) -> Result<Self> {
        config.validate()?;
        let session = BrowserSession::from_config(&config.browser, config.user_agent.as_deref())?;
        let runner = AdapterRunner::new(
            adapters::build(&config.sources),
            Arc::new(session),
            RunnerConfig::from(config),
        )?;
        Ok(Self::new(
            runner,
            QueryCache::new(Duration::from_secs(config.cache_ttl_secs)),
            AdmissionLimiter::new(config.admission.clone()),
        ))
    }

    /// Aggregate prices for `term` without admission control.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScrapeError::InvalidQuery`] for a blank term.
    /// Storefront failures never surface here; they only shrink the response.
    pub async fn aggregate(&self, term: &str) -> Result<AggregateResponse> {
        Ok(self.aggregate_detailed(None, term).await?.response)
    }

    /// Aggregate prices for `term` on behalf of `caller`.
    ///
    /// Cache hits are served without consuming the caller's quota.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScrapeError::InvalidQuery`] for a blank term and
    /// [`crate::ScrapeError::AdmissionDenied`] when the caller's aggregate
    /// quota is exhausted; in that case no storefront is contacted.
    pub async fn aggregate_for(&self, caller: &CallerId, term: &str) -> Result<AggregateResponse> {
        Ok(self.aggregate_detailed(Some(caller), term).await?.response)
    }

    /// Aggregate and also return the fan-out report.
    ///
    /// # Errors
    ///
    /// Same as [`PriceAggregator::aggregate_for`] (admission is skipped
    /// when `caller` is `None`).
    pub async fn aggregate_detailed(&self, caller: Option<&CallerId>, term: &str) -> Result<Aggregation> {
        let query = SearchQuery::new(term)?;

        if let Some(response) = self.cache.get(&query).await {
            tracing::debug!(groups = response.len(), "serving aggregate from cache");
            return Ok(Aggregation {
                response,
                report: None,
                cached: true,
            });
        }

        if let Some(caller) = caller {
            self.admit(caller, OperationClass::Aggregate)?;
        }

        tracing::trace!(query = %query, "aggregating");
        let report = self.runner.run(&query).await;
        let response = pipeline::assemble(&report);
        self.cache.insert(query, response.clone()).await;

        tracing::info!(
            groups = response.len(),
            products = response.product_count(),
            succeeded = report.succeeded(),
            adapters = report.runs.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "aggregate complete"
        );
        Ok(Aggregation {
            response,
            report: Some(report),
            cached: false,
        })
    }

    /// Admit one request of `class` for `caller`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScrapeError::AdmissionDenied`] with the wait time.
    pub fn admit(&self, caller: &CallerId, class: OperationClass) -> Result<()> {
        self.limiter.check(caller, class).into_result(class)
    }

    /// Current readiness.
    pub async fn health(&self) -> HealthReport {
        HealthReport {
            browser: self.runner.session().status().await,
            sources: self
                .runner
                .sources()
                .into_iter()
                .map(|info| info.name)
                .collect(),
            cached_queries: self.cache.entry_count().await,
        }
    }

    /// The query cache.
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// The adapter runner.
    pub fn runner(&self) -> &AdapterRunner {
        &self.runner
    }

    /// Stop the browser session. Fetch-based storefronts keep working.
    pub async fn shutdown(&self) {
        self.runner.session().shutdown().await;
        tracing::info!("price aggregator shut down");
    }
}

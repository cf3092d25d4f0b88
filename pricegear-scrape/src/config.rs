//! Scrape configuration with sensible defaults.
//!
//! [`ScrapeConfig`] controls which storefronts are queried, the time
//! budgets, caching, the browser session and admission quotas. It is
//! serde-friendly so an application can embed it in its own config file.

use serde::{Deserialize, Serialize};

use crate::admission::AdmissionConfig;
use crate::error::ScrapeError;
use crate::types::Source;

/// Browser session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Rendering service endpoint, e.g. `http://localhost:3000`. `None`
    /// disables the render path.
    pub endpoint: Option<String>,
    /// Access token sent as the `token` query parameter.
    pub token: Option<String>,
    /// Maximum simultaneously open browser contexts.
    pub max_contexts: usize,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            max_contexts: 2,
        }
    }
}

/// Configuration for price aggregation.
///
/// Use [`Default::default()`] for the production storefront set, or
/// override individual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Storefronts to query, in registration (and response) order.
    pub sources: Vec<Source>,
    /// Per-adapter budget for fetch-based storefronts, in seconds.
    pub fetch_timeout_secs: u64,
    /// Per-adapter budget for render-based storefronts, in seconds.
    pub render_timeout_secs: u64,
    /// Bound on one whole aggregation, in seconds.
    pub request_deadline_secs: u64,
    /// Concurrent fetch-based invocations. `None` means one per fetch source.
    pub worker_pool_size: Option<usize>,
    /// How long aggregates are cached, in seconds. 0 disables caching.
    pub cache_ttl_secs: u64,
    /// Custom User-Agent. If `None`, rotates through a built-in list of
    /// realistic browser User-Agents.
    pub user_agent: Option<String>,
    /// Browser session settings.
    pub browser: BrowserConfig,
    /// Per-caller quotas.
    pub admission: AdmissionConfig,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            sources: Source::all().to_vec(),
            fetch_timeout_secs: 15,
            render_timeout_secs: 25,
            request_deadline_secs: 30,
            worker_pool_size: None,
            cache_ttl_secs: 300,
            user_agent: None,
            browser: BrowserConfig::default(),
            admission: AdmissionConfig::default(),
        }
    }
}

impl ScrapeConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `sources` must not be empty
    /// - all timeouts must be greater than 0
    /// - `render_timeout_secs` must be at least `fetch_timeout_secs`, and
    ///   `request_deadline_secs` at least `render_timeout_secs`
    /// - `worker_pool_size`, when set, must be greater than 0
    /// - `browser.max_contexts` must be greater than 0, and with an endpoint
    ///   configured, at least the number of render-based sources
    /// - every admission quota must have a non-zero limit and window
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.sources.is_empty() {
            return Err(ScrapeError::Config(
                "at least one source must be enabled".into(),
            ));
        }
        if self.fetch_timeout_secs == 0 || self.render_timeout_secs == 0 {
            return Err(ScrapeError::Config(
                "adapter timeouts must be greater than 0".into(),
            ));
        }
        if self.request_deadline_secs == 0 {
            return Err(ScrapeError::Config(
                "request_deadline_secs must be greater than 0".into(),
            ));
        }
        if self.render_timeout_secs < self.fetch_timeout_secs {
            return Err(ScrapeError::Config(
                "render_timeout_secs must not be shorter than fetch_timeout_secs".into(),
            ));
        }
        if self.request_deadline_secs < self.render_timeout_secs {
            return Err(ScrapeError::Config(
                "request_deadline_secs must not be shorter than render_timeout_secs".into(),
            ));
        }
        if self.worker_pool_size == Some(0) {
            return Err(ScrapeError::Config(
                "worker_pool_size must be greater than 0".into(),
            ));
        }
        if self.browser.max_contexts == 0 {
            return Err(ScrapeError::Config(
                "browser.max_contexts must be greater than 0".into(),
            ));
        }
        let render_sources = self.sources.iter().filter(|s| s.needs_render()).count();
        if self.browser.endpoint.is_some() && self.browser.max_contexts < render_sources {
            return Err(ScrapeError::Config(format!(
                "browser.max_contexts ({}) is below the {render_sources} render-based sources",
                self.browser.max_contexts
            )));
        }
        self.admission.validate()
    }
}

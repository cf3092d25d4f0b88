//! The storefront adapter contract.
//!
//! Every storefront implements [`SourceAdapter`]: it knows how to build a
//! search URL for a query and how to pull [`RawRecord`]s out of the returned
//! HTML. Adapters declare an [`AdapterKind`] so the runner can schedule them
//! on the right execution path: plain HTTP for [`AdapterKind::Fetch`], an
//! isolated browser context for [`AdapterKind::Render`]. The page itself is
//! obtained through a [`PageLoader`], which is what differs between the two
//! paths.
//!
//! Adapters hold no per-query state and never see each other's results.

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{RawRecord, SearchQuery, SourceInfo};

/// When a rendered navigation counts as finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    /// The `load` event (all subresources).
    Load,
    /// The `DOMContentLoaded` event.
    DomContentLoaded,
}

impl WaitUntil {
    /// The event name as understood by the rendering service.
    pub fn as_event(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "domcontentloaded",
        }
    }
}

/// How a render-based storefront page is loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Budget for the navigation itself.
    pub navigation_timeout: Duration,
    /// Navigation completion event.
    pub wait_until: WaitUntil,
    /// Extra wait after navigation for scripted content to settle.
    pub settle: Duration,
    /// Scroll to the bottom before capturing, to trigger lazy listings.
    pub scroll_to_bottom: bool,
    /// Hide automation markers such as `navigator.webdriver` from the page.
    pub mask_automation: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(15),
            wait_until: WaitUntil::Load,
            settle: Duration::from_secs(1),
            scroll_to_bottom: true,
            mask_automation: false,
        }
    }
}

/// Execution path an adapter needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterKind {
    /// One HTTP request plus static markup parsing.
    Fetch,
    /// Full page rendering in an isolated browser context.
    Render(RenderOptions),
}

impl AdapterKind {
    /// Short label used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Render(_) => "render",
        }
    }

    /// Whether this adapter needs the browser session.
    pub fn is_render(&self) -> bool {
        matches!(self, Self::Render(_))
    }
}

/// What one adapter pulled out of one search page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Records in page order.
    pub records: Vec<RawRecord>,
    /// Logo advertised by the page, overriding the static one.
    pub logo_url: Option<String>,
}

impl Extraction {
    /// An extraction with records and no page logo.
    pub fn from_records(records: Vec<RawRecord>) -> Self {
        Self {
            records,
            logo_url: None,
        }
    }
}

/// Source of page HTML for an adapter invocation.
#[async_trait]
pub trait PageLoader: Send {
    /// Load `url` and return its (possibly rendered) HTML.
    async fn load(&mut self, url: &str) -> Result<String>;
}

/// A storefront extraction adapter.
///
/// Implementors provide the site-specific parts: identity, kind, search URL
/// and markup parsing. The provided [`SourceAdapter::extract`] ties them
/// together; adapters that need more than one page override it.
///
/// Errors returned here are adapter-local. The runner converts them into an
/// empty result for this source and a structured event.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Storefront identity.
    fn info(&self) -> &SourceInfo;

    /// Which execution path this adapter needs.
    fn kind(&self) -> AdapterKind;

    /// Absolute search URL for `query`.
    fn search_url(&self, query: &SearchQuery) -> String;

    /// Extract raw records from a search results page.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScrapeError::Parse`] if the markup cannot be parsed.
    fn parse(&self, html: &str) -> Result<Extraction>;

    /// Load the search page through `loader` and parse it.
    ///
    /// # Errors
    ///
    /// Propagates loader and parse errors.
    async fn extract(&self, query: &SearchQuery, loader: &mut dyn PageLoader) -> Result<Extraction> {
        let url = self.search_url(query);
        tracing::trace!(source = %self.info().name, %url, "loading search page");
        let html = loader.load(&url).await?;
        tracing::trace!(source = %self.info().name, bytes = html.len(), "search page loaded");
        self.parse(&html)
    }
}

/// Percent-encode a query for use in a path segment or query value.
pub fn encode_term(query: &SearchQuery) -> Cow<'_, str> {
    urlencoding::encode(query.as_str())
}

//! Ryans: listing is built client-side, so the page must be rendered.
//!
//! Waits for the full `load` event, lets scripts settle, then scrolls to
//! the bottom so lazily inserted cards are present before capture. The
//! storefront turns away visibly automated browsers, so automation
//! markers are masked.

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;

use crate::adapter::{encode_term, AdapterKind, Extraction, RenderOptions, SourceAdapter, WaitUntil};
use crate::error::Result;
use crate::types::{SearchQuery, Source, SourceInfo};

use super::markup::{parse_listing, Listing};

const LISTING: Listing<'static> = Listing {
    item: ".category-single-product",
    name: &[".card-body .card-text a"],
    price: &[".pr-text"],
    image: &[".image-box img"],
    link: &[".image-box a"],
    require_name: true,
};

/// Ryans storefront adapter.
pub struct RyansAdapter {
    info: SourceInfo,
}

impl RyansAdapter {
    /// Adapter pointed at the production storefront.
    pub fn new() -> Self {
        Self {
            info: SourceInfo::for_source(Source::Ryans),
        }
    }

    /// Adapter pointed at another host.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScrapeError::Config`] for a non-absolute URL.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            info: SourceInfo::for_source(Source::Ryans).with_base_url(base_url)?,
        })
    }
}

impl Default for RyansAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for RyansAdapter {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Render(RenderOptions {
            navigation_timeout: Duration::from_secs(15),
            wait_until: WaitUntil::Load,
            settle: Duration::from_secs(2),
            scroll_to_bottom: true,
            mask_automation: true,
        })
    }

    fn search_url(&self, query: &SearchQuery) -> String {
        self.info.join(&format!("search?q={}", encode_term(query)))
    }

    fn parse(&self, html: &str) -> Result<Extraction> {
        parse_ryans_html(html)
    }
}

/// Parse a rendered Ryans search page.
pub(crate) fn parse_ryans_html(html: &str) -> Result<Extraction> {
    let document = Html::parse_document(html);
    let records = parse_listing(&document, &LISTING)?;
    tracing::debug!(count = records.len(), "Ryans records parsed");
    Ok(Extraction::from_records(records))
}

//! Star Tech: static search page, one request per query.

use async_trait::async_trait;
use scraper::Html;

use crate::adapter::{encode_term, AdapterKind, Extraction, SourceAdapter};
use crate::error::Result;
use crate::types::{SearchQuery, Source, SourceInfo};

use super::markup::{parse_listing, Listing};

const LISTING: Listing<'static> = Listing {
    item: ".p-item",
    name: &[".p-item-name"],
    price: &[".price-new", ".p-item-price"],
    image: &[".p-item-img img"],
    link: &[".p-item-img a"],
    require_name: false,
};

/// Star Tech storefront adapter.
pub struct StarTechAdapter {
    info: SourceInfo,
}

impl StarTechAdapter {
    /// Adapter pointed at the production storefront.
    pub fn new() -> Self {
        Self {
            info: SourceInfo::for_source(Source::StarTech),
        }
    }

    /// Adapter pointed at another host, e.g. a test server.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScrapeError::Config`] for a non-absolute URL.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            info: SourceInfo::for_source(Source::StarTech).with_base_url(base_url)?,
        })
    }
}

impl Default for StarTechAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for StarTechAdapter {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Fetch
    }

    fn search_url(&self, query: &SearchQuery) -> String {
        self.info
            .join(&format!("product/search?search={}", encode_term(query)))
    }

    fn parse(&self, html: &str) -> Result<Extraction> {
        parse_startech_html(html)
    }
}

/// Parse a Star Tech search results page.
pub(crate) fn parse_startech_html(html: &str) -> Result<Extraction> {
    let document = Html::parse_document(html);
    let records = parse_listing(&document, &LISTING)?;
    tracing::debug!(count = records.len(), "StarTech records parsed");
    Ok(Extraction::from_records(records))
}

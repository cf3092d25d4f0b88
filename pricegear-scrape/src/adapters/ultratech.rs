//! Ultra Technology: OpenCart search page.

use async_trait::async_trait;
use scraper::Html;

use crate::adapter::{encode_term, AdapterKind, Extraction, SourceAdapter};
use crate::error::Result;
use crate::types::{SearchQuery, Source, SourceInfo};

use super::markup::{parse_listing, Listing};

const LISTING: Listing<'static> = Listing {
    item: ".product-layout",
    name: &[".name"],
    price: &[".price-new"],
    image: &[".product-img img"],
    link: &[".product-img"],
    require_name: false,
};

/// Ultra Technology storefront adapter.
pub struct UltraTechAdapter {
    info: SourceInfo,
}

impl UltraTechAdapter {
    /// Adapter pointed at the production storefront.
    pub fn new() -> Self {
        Self {
            info: SourceInfo::for_source(Source::UltraTech),
        }
    }

    /// Adapter pointed at another host.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScrapeError::Config`] for a non-absolute URL.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            info: SourceInfo::for_source(Source::UltraTech).with_base_url(base_url)?,
        })
    }
}

impl Default for UltraTechAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for UltraTechAdapter {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Fetch
    }

    fn search_url(&self, query: &SearchQuery) -> String {
        self.info.join(&format!(
            "index.php?route=product/search&search={}",
            encode_term(query)
        ))
    }

    fn parse(&self, html: &str) -> Result<Extraction> {
        parse_ultratech_html(html)
    }
}

/// Parse an Ultra Technology search results page.
pub(crate) fn parse_ultratech_html(html: &str) -> Result<Extraction> {
    let document = Html::parse_document(html);
    let records = parse_listing(&document, &LISTING)?;
    tracing::debug!(count = records.len(), "UltraTech records parsed");
    Ok(Extraction::from_records(records))
}

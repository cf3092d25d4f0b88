//! Skyland: OpenCart search page; images are often lazy (`data-src`).

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
    image: &[".image img", ".product-img img", "img"],
    link: &[".product-img", ".name a"],
    require_name: false,
};

/// Skyland storefront adapter.
pub struct SkylandAdapter {
    info: SourceInfo,
}

impl SkylandAdapter {
    /// Adapter pointed at the production storefront.
    pub fn new() -> Self {
        Self {
            info: SourceInfo::for_source(Source::Skyland),
        }
    }

    /// Adapter pointed at another host.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScrapeError::Config`] for a non-absolute URL.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            info: SourceInfo::for_source(Source::Skyland).with_base_url(base_url)?,
        })
    }
}

impl Default for SkylandAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for SkylandAdapter {
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
        parse_skyland_html(html)
    }
}

/// Parse a Skyland search results page.
pub(crate) fn parse_skyland_html(html: &str) -> Result<Extraction> {
    let document = Html::parse_document(html);
    let records = parse_listing(&document, &LISTING)?;
    tracing::debug!(count = records.len(), "Skyland records parsed");
    Ok(Extraction::from_records(records))
}

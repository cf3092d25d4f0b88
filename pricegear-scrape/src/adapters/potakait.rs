//! Potaka IT: OpenCart search page with struck-through old prices.

use async_trait::async_trait;
use scraper::Html;

use crate::adapter::{encode_term, AdapterKind, Extraction, SourceAdapter};
use crate::error::Result;
use crate::types::{SearchQuery, Source, SourceInfo};

use super::markup::{parse_listing, Listing};

const LISTING: Listing<'static> = Listing {
    item: ".product-item",
    name: &[".title a"],
    price: &[".price:not(.old)"],
    image: &[".product-img img"],
    link: &[".title a"],
    require_name: false,
};

/// Potaka IT storefront adapter.
pub struct PotakaItAdapter {
    info: SourceInfo,
}

impl PotakaItAdapter {
    /// Adapter pointed at the production storefront.
    pub fn new() -> Self {
        Self {
            info: SourceInfo::for_source(Source::PotakaIt),
        }
    }

    /// Adapter pointed at another host.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScrapeError::Config`] for a non-absolute URL.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            info: SourceInfo::for_source(Source::PotakaIt).with_base_url(base_url)?,
        })
    }
}

impl Default for PotakaItAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for PotakaItAdapter {
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
        parse_potakait_html(html)
    }
}

/// Parse a Potaka IT search results page.
pub(crate) fn parse_potakait_html(html: &str) -> Result<Extraction> {
    let document = Html::parse_document(html);
    let records = parse_listing(&document, &LISTING)?;
    tracing::debug!(count = records.len(), "PotakaIT records parsed");
    Ok(Extraction::from_records(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_POTAKA_HTML: &str = r#"<html><body>
<div class="product-item">
  <div class="product-img"><img src="https://www.potakait.com/image/cache/catalog/tp-link-archer-c6.jpg"></div>
  <h4 class="title"><a href="https://www.potakait.com/tp-link-archer-c6">TP-Link Archer C6 AC1200 Router</a></h4>
  <div class="prices"><span class="price old">3,400৳</span><span class="price">2,950৳</span></div>
</div>
</body></html>"#;

    #[test]
    fn parse_skips_old_price() {
        let records = parse_potakait_html(MOCK_POTAKA_HTML).expect("parse").records;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name.as_deref(), Some("TP-Link Archer C6 AC1200 Router"));
        assert_eq!(records[0].price_text.as_deref(), Some("2,950৳"));
        assert_eq!(
            records[0].link.as_deref(),
            Some("https://www.potakait.com/tp-link-archer-c6")
        );
    }

    #[test]
    fn source_name_matches_catalogue() {
        assert_eq!(PotakaItAdapter::new().info().name, "PotakaIT");
    }
}

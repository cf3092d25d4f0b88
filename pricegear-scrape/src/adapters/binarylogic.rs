//! Binary Logic: script-rendered search page.
//!
//! The grid is present at `DOMContentLoaded`; a short settle plus a scroll
//! is enough for the lazy cards.

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;

use crate::adapter::{encode_term, AdapterKind, Extraction, RenderOptions, SourceAdapter, WaitUntil};
use crate::error::Result;
use crate::types::{SearchQuery, Source, SourceInfo};

use super::markup::{parse_listing, Listing};

const LISTING: Listing<'static> = Listing {
    item: ".single_product",
    name: &[".p-item-name"],
    price: &[".current_price"],
    image: &[".p-item-img img"],
    link: &[".p-item-img a"],
    require_name: false,
};

/// Binary Logic storefront adapter.
pub struct BinaryLogicAdapter {
    info: SourceInfo,
}

impl BinaryLogicAdapter {
    /// Adapter pointed at the production storefront.
    pub fn new() -> Self {
        Self {
            info: SourceInfo::for_source(Source::BinaryLogic),
        }
    }

    /// Adapter pointed at another host.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScrapeError::Config`] for a non-absolute URL.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            info: SourceInfo::for_source(Source::BinaryLogic).with_base_url(base_url)?,
        })
    }
}

impl Default for BinaryLogicAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for BinaryLogicAdapter {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Render(RenderOptions {
            navigation_timeout: Duration::from_secs(12),
            wait_until: WaitUntil::DomContentLoaded,
            settle: Duration::from_secs(1),
            scroll_to_bottom: true,
            mask_automation: false,
        })
    }

    fn search_url(&self, query: &SearchQuery) -> String {
        self.info.join(&format!("search/{}", encode_term(query)))
    }

    fn parse(&self, html: &str) -> Result<Extraction> {
        parse_binarylogic_html(html)
    }
}

/// Parse a rendered Binary Logic search page.
pub(crate) fn parse_binarylogic_html(html: &str) -> Result<Extraction> {
    let document = Html::parse_document(html);
    let records = parse_listing(&document, &LISTING)?;
    tracing::debug!(count = records.len(), "BinaryLogic records parsed");
    Ok(Extraction::from_records(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_BINARY_HTML: &str = r#"<html><body>
<div class="products">
  <div class="single_product">
    <div class="p-item-img">
      <a href="/product/asus-tuf-gaming-m3"><img src="/images/product/tuf-m3.webp"></a>
    </div>
    <div class="p-item-name">ASUS TUF Gaming M3 Gen II</div>
    <div class="current_price">1,750 ৳</div>
  </div>
  <div class="single_product">
    <div class="p-item-img"><a href="/product/mystery"></a></div>
  </div>
</div>
</body></html>"#;

    #[test]
    fn parse_mock_html_returns_relative_links() {
        let records = parse_binarylogic_html(MOCK_BINARY_HTML).expect("parse").records;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.as_deref(), Some("ASUS TUF Gaming M3 Gen II"));
        assert_eq!(records[0].price_text.as_deref(), Some("1,750 ৳"));
        assert_eq!(records[0].link.as_deref(), Some("/product/asus-tuf-gaming-m3"));
        assert_eq!(records[0].image.as_deref(), Some("/images/product/tuf-m3.webp"));
        // Garbage card: no name, no price; dropped later by the normalizer.
        assert!(records[1].name.is_none());
        assert!(records[1].price_text.is_none());
    }

    #[test]
    fn search_url_uses_path_segment() {
        let query = SearchQuery::new("rtx 4060").expect("valid");
        assert_eq!(
            BinaryLogicAdapter::new().search_url(&query),
            "https://www.binarylogic.com.bd/search/rtx%204060"
        );
    }

    #[test]
    fn kind_is_render_with_dom_wait() {
        match BinaryLogicAdapter::new().kind() {
            AdapterKind::Render(options) => {
                assert_eq!(options.wait_until, WaitUntil::DomContentLoaded);
                assert_eq!(options.navigation_timeout, Duration::from_secs(12));
            }
            AdapterKind::Fetch => panic!("BinaryLogic must be render-based"),
        }
    }
}

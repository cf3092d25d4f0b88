//! PC House: static search page; the page header carries the current logo.

use async_trait::async_trait;
use scraper::Html;

use crate::adapter::{encode_term, AdapterKind, Extraction, SourceAdapter};
use crate::error::Result;
use crate::types::{SearchQuery, Source, SourceInfo};

use super::markup::{attr_of, parse_listing, selector, Listing};

const LISTING: Listing<'static> = Listing {
    item: ".single-product-item",
    name: &["h4 a"],
    price: &[".special-price", ".regular-price"],
    image: &["img"],
    link: &["h4 a"],
    require_name: true,
};

/// PC House storefront adapter.
pub struct PcHouseAdapter {
    info: SourceInfo,
}

impl PcHouseAdapter {
    /// Adapter pointed at the production storefront.
    pub fn new() -> Self {
        Self {
            info: SourceInfo::for_source(Source::PcHouse),
        }
    }

    /// Adapter pointed at another host.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScrapeError::Config`] for a non-absolute URL.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Ok(Self {
            info: SourceInfo::for_source(Source::PcHouse).with_base_url(base_url)?,
        })
    }
}

impl Default for PcHouseAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceAdapter for PcHouseAdapter {
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
        parse_pchouse_html(html)
    }
}

/// Parse a PC House search results page, including the header logo.
pub(crate) fn parse_pchouse_html(html: &str) -> Result<Extraction> {
    let document = Html::parse_document(html);
    let logo_sel = selector(".logo img")?;
    let logo_url = document
        .select(&logo_sel)
        .next()
        .and_then(|el| attr_of(el, &["src"]));

    let records = parse_listing(&document, &LISTING)?;
    tracing::debug!(count = records.len(), "PCHouse records parsed");
    Ok(Extraction { records, logo_url })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOCK_PCHOUSE_HTML: &str = r#"<html><body>
<header><div class="logo"><a href="/"><img src="https://www.pchouse.com.bd/image/catalog/logo-2024.png"></a></div></header>
<div class="single-product-item">
  <img src="https://www.pchouse.com.bd/image/cache/catalog/rapoo-m100.jpg">
  <h4><a href="https://www.pchouse.com.bd/rapoo-m100-silent">Rapoo M100 Silent Wireless Mouse</a></h4>
  <div class="price"><span class="special-price">৳ 790</span><span class="regular-price">৳ 850</span></div>
</div>
<div class="single-product-item">
  <img src="https://www.pchouse.com.bd/image/cache/catalog/hp-x200.jpg">
  <h4><a href="https://www.pchouse.com.bd/hp-x200">HP X200 Wireless Mouse</a></h4>
  <div class="price"><span class="regular-price">৳ 1,050</span></div>
</div>
<div class="single-product-item banner"><img src="/promo.jpg"></div>
</body></html>"#;

    #[test]
    fn parse_mock_html_prefers_special_price() {
        let extraction = parse_pchouse_html(MOCK_PCHOUSE_HTML).expect("parse");
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.records[0].price_text.as_deref(), Some("৳ 790"));
        assert_eq!(extraction.records[1].price_text.as_deref(), Some("৳ 1,050"));
    }

    #[test]
    fn parse_reads_page_logo() {
        let extraction = parse_pchouse_html(MOCK_PCHOUSE_HTML).expect("parse");
        assert_eq!(
            extraction.logo_url.as_deref(),
            Some("https://www.pchouse.com.bd/image/catalog/logo-2024.png")
        );
    }

    #[test]
    fn missing_logo_leaves_static_fallback() {
        let extraction = parse_pchouse_html("<html><body></body></html>").expect("parse");
        assert!(extraction.logo_url.is_none());
        assert!(extraction.records.is_empty());
    }
}

//! Selector helpers shared by the storefront adapters.
//!
//! Most storefronts render a flat product grid: one element per product,
//! with name, price, image and link somewhere inside it. [`Listing`]
//! describes where, with fallback selectors tried in order, and
//! [`parse_listing`] turns a document into [`RawRecord`]s.

use scraper::{ElementRef, Html, Selector};

use crate::error::{Result, ScrapeError};
use crate::types::RawRecord;

/// Attributes an image reference may live in, in order of preference.
const IMAGE_ATTRS: &[&str] = &["src", "data-src"];

/// Where the fields of one product card live.
pub(crate) struct Listing<'a> {
    /// Selector matching one product card.
    pub item: &'a str,
    /// Name element candidates; first match wins.
    pub name: &'a [&'a str],
    /// Price element candidates; first match wins.
    pub price: &'a [&'a str],
    /// Image element candidates; first match wins.
    pub image: &'a [&'a str],
    /// Link element candidates; first match wins.
    pub link: &'a [&'a str],
    /// Skip cards without a name element.
    pub require_name: bool,
}

/// Compile a CSS selector, mapping failures to [`ScrapeError::Parse`].
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Parse(format!("invalid selector {css:?}: {e:?}")))
}

fn selectors(candidates: &[&str]) -> Result<Vec<Selector>> {
    candidates.iter().map(|css| selector(css)).collect()
}

/// The first element inside `scope` matched by any candidate, in candidate order.
pub(crate) fn first_match<'a>(scope: ElementRef<'a>, candidates: &[Selector]) -> Option<ElementRef<'a>> {
    candidates.iter().find_map(|sel| scope.select(sel).next())
}

/// Trimmed text content, `None` when blank.
pub(crate) fn text_of(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<String>();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// The first non-blank attribute among `attrs`.
pub(crate) fn attr_of(element: ElementRef<'_>, attrs: &[&str]) -> Option<String> {
    attrs.iter().find_map(|attr| {
        element
            .value()
            .attr(attr)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

/// Parse every product card described by `listing`.
pub(crate) fn parse_listing(document: &Html, listing: &Listing<'_>) -> Result<Vec<RawRecord>> {
    let item_sel = selector(listing.item)?;
    let name_sels = selectors(listing.name)?;
    let price_sels = selectors(listing.price)?;
    let image_sels = selectors(listing.image)?;
    let link_sels = selectors(listing.link)?;

    let mut records = Vec::new();
    for card in document.select(&item_sel) {
        let name_el = first_match(card, &name_sels);
        if listing.require_name && name_el.is_none() {
            continue;
        }

        records.push(RawRecord {
            name: name_el.and_then(text_of),
            price_text: first_match(card, &price_sels).and_then(text_of),
            image: first_match(card, &image_sels).and_then(|el| attr_of(el, IMAGE_ATTRS)),
            link: first_match(card, &link_sels).and_then(|el| attr_of(el, &["href"])),
        });
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRID: &str = r#"
<div class="grid">
  <div class="card">
    <h4 class="title"><a href="/p/1">  Logitech G102  </a></h4>
    <span class="old">৳2,000</span><span class="now">৳1,650</span>
    <img data-src="/img/1.jpg">
  </div>
  <div class="card">
    <span class="now">৳900</span>
  </div>
  <div class="card">
    <h4 class="title"><a href="/p/3">Fantech X9</a></h4>
    <img src="">
  </div>
</div>"#;

    fn listing(require_name: bool) -> Listing<'static> {
        Listing {
            item: ".card",
            name: &[".title a"],
            price: &[".sale", ".now"],
            image: &["img"],
            link: &[".title a"],
            require_name,
        }
    }

    #[test]
    fn parses_cards_with_fallbacks() {
        let doc = Html::parse_document(GRID);
        let records = parse_listing(&doc, &listing(false)).expect("parse");
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name.as_deref(), Some("Logitech G102"));
        assert_eq!(records[0].price_text.as_deref(), Some("৳1,650"));
        assert_eq!(records[0].image.as_deref(), Some("/img/1.jpg"));
        assert_eq!(records[0].link.as_deref(), Some("/p/1"));
        assert!(records[1].name.is_none());
        assert!(records[2].image.is_none(), "blank src is ignored");
        assert!(records[2].price_text.is_none());
    }

    #[test]
    fn require_name_skips_anonymous_cards() {
        let doc = Html::parse_document(GRID);
        let records = parse_listing(&doc, &listing(true)).expect("parse");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn invalid_selector_is_parse_error() {
        let err = selector("div[[").unwrap_err();
        assert!(matches!(err, ScrapeError::Parse(_)));
    }

    #[test]
    fn empty_document_yields_nothing() {
        let doc = Html::parse_document("<html><body></body></html>");
        assert!(parse_listing(&doc, &listing(false)).expect("parse").is_empty());
    }
}

//! Core types: storefront identification, queries, raw and normalised records.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

use crate::error::{Result, ScrapeError};

/// Display string used for products without a resolvable price.
pub const OUT_OF_STOCK: &str = "Out Of Stock";

/// Storefronts that pricegear knows how to scrape.
///
/// Declaration order is the default registration order, which is also the
/// order of groups in an [`AggregateResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// Star Tech: static OpenCart-style listing.
    StarTech,
    /// Ryans: script-rendered listing, needs the browser session.
    Ryans,
    /// Skyland: static OpenCart listing with lazy images.
    Skyland,
    /// PC House: static listing, logo read from the page.
    #[serde(rename = "PCHouse")]
    PcHouse,
    /// Ultra Technology: static OpenCart listing.
    UltraTech,
    /// Binary Logic: script-rendered listing, needs the browser session.
    BinaryLogic,
    /// Potaka IT: static OpenCart listing.
    #[serde(rename = "PotakaIT")]
    PotakaIt,
}

impl Source {
    /// Returns the display name, which is also the source key in responses.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StarTech => "StarTech",
            Self::Ryans => "Ryans",
            Self::Skyland => "Skyland",
            Self::PcHouse => "PCHouse",
            Self::UltraTech => "UltraTech",
            Self::BinaryLogic => "BinaryLogic",
            Self::PotakaIt => "PotakaIT",
        }
    }

    /// Returns the storefront root used to resolve relative links.
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::StarTech => "https://www.startech.com.bd/",
            Self::Ryans => "https://www.ryans.com/",
            Self::Skyland => "https://www.skyland.com.bd/",
            Self::PcHouse => "https://www.pchouse.com.bd/",
            Self::UltraTech => "https://www.ultratech.com.bd/",
            Self::BinaryLogic => "https://www.binarylogic.com.bd/",
            Self::PotakaIt => "https://www.potakait.com/",
        }
    }

    /// Returns the storefront logo shown next to its result group.
    pub fn logo_url(&self) -> &'static str {
        match self {
            Self::StarTech => "https://www.startech.com.bd/image/catalog/logo.png",
            Self::Ryans => "https://www.ryans.com/assets/images/ryans-logo.svg",
            Self::Skyland => {
                "https://www.skyland.com.bd/image/cache/wp/gp/skyland-logo-1398x471.webp"
            }
            Self::PcHouse => "https://www.pchouse.com.bd/image/catalog/unnamed.png",
            Self::UltraTech => {
                "https://www.ultratech.com.bd/image/cache/catalog/website/logo/ultra-technology-header-logo-500x500.png.webp"
            }
            Self::BinaryLogic => {
                "https://www.binarylogic.com.bd/images/brand_image/binary-logic.webp"
            }
            Self::PotakaIt => "https://potakait.com/image/catalog/potaka-logo.png",
        }
    }

    /// Whether the storefront's listing is built client-side and must be rendered.
    pub fn needs_render(&self) -> bool {
        matches!(self, Self::Ryans | Self::BinaryLogic)
    }

    /// Returns all known storefronts in registration order.
    pub fn all() -> &'static [Source] {
        &[
            Self::StarTech,
            Self::Ryans,
            Self::Skyland,
            Self::PcHouse,
            Self::UltraTech,
            Self::BinaryLogic,
            Self::PotakaIt,
        ]
    }

    /// Case-insensitive lookup by display name.
    pub fn from_name(name: &str) -> Option<Source> {
        Self::all()
            .iter()
            .copied()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity of the storefront behind one adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    /// Source name; unique within one runner.
    pub name: String,
    /// Logo used when the page does not advertise its own.
    pub logo_url: String,
    /// Root that search URLs and relative links are resolved against.
    pub base_url: Url,
}

impl SourceInfo {
    /// Build an identity from explicit parts.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] if `base_url` is not an absolute URL.
    pub fn new(name: impl Into<String>, logo_url: impl Into<String>, base_url: &str) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        Ok(Self {
            name: name.into(),
            logo_url: logo_url.into(),
            base_url,
        })
    }

    /// Identity of a known storefront with its production base URL.
    pub fn for_source(source: Source) -> Self {
        Self {
            name: source.name().to_string(),
            logo_url: source.logo_url().to_string(),
            // Catalogue literals are absolute; covered by `source_base_urls_parse`.
            base_url: Url::parse(source.base_url()).expect("catalogue base URL is absolute"),
        }
    }

    /// Replace the base URL, e.g. to point an adapter at a test server.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Config`] if `base_url` is not an absolute URL.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    /// Join a path (and query) onto the base URL.
    pub fn join(&self, path: &str) -> String {
        self.base_url
            .join(path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}{}", self.base_url, path))
    }
}

/// Parse a base URL, forcing a trailing slash so relative joins keep the path.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| ScrapeError::Config(format!("invalid base URL {raw:?}: {e}")))
}

/// A normalised search term: trimmed, whitespace-collapsed and case-folded.
///
/// Two terms that differ only in case or spacing are the same query, both
/// for caching and for admission scoping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SearchQuery(String);

impl SearchQuery {
    /// Normalise a raw search term.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::InvalidQuery`] if nothing remains after trimming.
    pub fn new(term: &str) -> Result<Self> {
        let normalised = term
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        if normalised.is_empty() {
            return Err(ScrapeError::InvalidQuery("search term is empty".into()));
        }
        Ok(Self(normalised))
    }

    /// The normalised term.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SearchQuery {
    type Error = ScrapeError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<SearchQuery> for String {
    fn from(query: SearchQuery) -> Self {
        query.0
    }
}

/// A product as scraped, before normalisation.
///
/// Fields are present only if the storefront exposed them. Links and image
/// references may be relative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    /// Product title text.
    pub name: Option<String>,
    /// Price text exactly as displayed, including currency decoration.
    pub price_text: Option<String>,
    /// Image reference (`src` or `data-src`).
    pub image: Option<String>,
    /// Product page link.
    pub link: Option<String>,
}

/// A normalised price.
///
/// Serialises as its display string; [`OUT_OF_STOCK`] round-trips to
/// [`Price::OutOfStock`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Price {
    /// A resolvable amount.
    Amount {
        /// Human-readable form, e.g. `"৳1,200"` or `"1,200"`.
        display: String,
        /// Numeric value with separators stripped.
        value: f64,
    },
    /// No resolvable price, or the storefront marked the item unavailable.
    OutOfStock,
}

impl Price {
    /// The display string (or [`OUT_OF_STOCK`]).
    pub fn display(&self) -> &str {
        match self {
            Self::Amount { display, .. } => display,
            Self::OutOfStock => OUT_OF_STOCK,
        }
    }

    /// The numeric value, if any.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Amount { value, .. } => Some(*value),
            Self::OutOfStock => None,
        }
    }

    /// Whether the product can currently be bought.
    pub fn is_in_stock(&self) -> bool {
        matches!(self, Self::Amount { .. })
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display())
    }
}

impl From<String> for Price {
    fn from(value: String) -> Self {
        crate::pipeline::normalize::normalize_price(&value)
    }
}

impl From<Price> for String {
    fn from(price: Price) -> Self {
        price.display().to_string()
    }
}

/// A normalised product, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Fresh per normalisation; not stable across scrapes.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Normalised price or the out-of-stock sentinel.
    pub price: Price,
    /// Absolute image URL.
    pub image_url: Option<String>,
    /// Absolute product page URL.
    pub product_url: Option<String>,
    /// Name of the storefront that listed this product.
    pub source: String,
}

/// All products one storefront returned for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceResult {
    /// Storefront name.
    pub source: String,
    /// Storefront logo URL.
    pub logo_url: String,
    /// Products in the order the storefront listed them.
    pub products: Vec<Product>,
}

/// The merged answer to one query: one group per storefront that returned
/// products, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateResponse {
    /// Non-empty groups with unique source names.
    pub results: Vec<SourceResult>,
}

impl AggregateResponse {
    /// Whether no storefront contributed anything.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of storefront groups.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Source names in response order.
    pub fn sources(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.source.as_str()).collect()
    }

    /// The group for a storefront, if present.
    pub fn get(&self, source: &str) -> Option<&SourceResult> {
        self.results.iter().find(|r| r.source == source)
    }

    /// Total products across all groups.
    pub fn product_count(&self) -> usize {
        self.results.iter().map(|r| r.products.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_names_round_trip() {
        for source in Source::all() {
            assert_eq!(Source::from_name(source.name()), Some(*source));
        }
        assert_eq!(Source::from_name("pchouse"), Some(Source::PcHouse));
        assert_eq!(Source::from_name("nowhere"), None);
    }

    #[test]
    fn source_all_in_registration_order() {
        let all = Source::all();
        assert_eq!(all.len(), 7);
        assert_eq!(all[0], Source::StarTech);
        assert_eq!(all[6], Source::PotakaIt);
    }

    #[test]
    fn source_serde_uses_display_names() {
        let json = serde_json::to_string(&Source::PcHouse).expect("serialize");
        assert_eq!(json, "\"PCHouse\"");
        let decoded: Source = serde_json::from_str("\"PotakaIT\"").expect("deserialize");
        assert_eq!(decoded, Source::PotakaIt);
    }

    #[test]
    fn source_base_urls_parse() {
        for source in Source::all() {
            let info = SourceInfo::for_source(*source);
            assert_eq!(info.base_url.as_str(), source.base_url());
            assert_eq!(info.name, source.name());
        }
    }

    #[test]
    fn source_info_with_base_url_adds_trailing_slash() {
        let info = SourceInfo::for_source(Source::StarTech)
            .with_base_url("http://127.0.0.1:9000/shop")
            .expect("valid url");
        assert_eq!(info.base_url.as_str(), "http://127.0.0.1:9000/shop/");
        assert_eq!(
            info.join("product/search?search=mouse"),
            "http://127.0.0.1:9000/shop/product/search?search=mouse"
        );
    }

    #[test]
    fn source_info_rejects_relative_base() {
        let err = SourceInfo::new("X", "logo", "not a url").unwrap_err();
        assert!(err.to_string().contains("base URL"));
    }

    #[test]
    fn query_is_trimmed_and_case_folded() {
        let a = SearchQuery::new("  Gaming   MOUSE ").expect("valid");
        let b = SearchQuery::new("gaming mouse").expect("valid");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "gaming mouse");
    }

    #[test]
    fn empty_query_rejected() {
        assert!(SearchQuery::new("   ").is_err());
        assert!(SearchQuery::new("").is_err());
    }

    #[test]
    fn query_deserialisation_normalises() {
        let q: SearchQuery = serde_json::from_str("\" Mouse \"").expect("deserialize");
        assert_eq!(q.as_str(), "mouse");
        assert!(serde_json::from_str::<SearchQuery>("\"  \"").is_err());
    }

    #[test]
    fn price_serialises_as_display_string() {
        let price = Price::Amount {
            display: "1,200".into(),
            value: 1200.0,
        };
        assert_eq!(serde_json::to_string(&price).expect("serialize"), "\"1,200\"");
        assert_eq!(
            serde_json::to_string(&Price::OutOfStock).expect("serialize"),
            format!("\"{OUT_OF_STOCK}\"")
        );
    }

    #[test]
    fn price_deserialises_sentinel() {
        let price: Price = serde_json::from_str(&format!("\"{OUT_OF_STOCK}\"")).expect("ok");
        assert_eq!(price, Price::OutOfStock);
        assert!(!price.is_in_stock());
        assert!(price.value().is_none());
    }

    #[test]
    fn aggregate_response_serialises_as_list() {
        let response = AggregateResponse {
            results: vec![SourceResult {
                source: "StarTech".into(),
                logo_url: "logo".into(),
                products: vec![],
            }],
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert!(json.is_array());
        assert_eq!(json[0]["source"], "StarTech");
    }

    #[test]
    fn aggregate_response_lookup() {
        let response = AggregateResponse {
            results: vec![
                SourceResult {
                    source: "A".into(),
                    logo_url: String::new(),
                    products: vec![],
                },
                SourceResult {
                    source: "B".into(),
                    logo_url: String::new(),
                    products: vec![],
                },
            ],
        };
        assert_eq!(response.sources(), vec!["A", "B"]);
        assert!(response.get("B").is_some());
        assert!(response.get("C").is_none());
        assert_eq!(response.product_count(), 0);
    }
}

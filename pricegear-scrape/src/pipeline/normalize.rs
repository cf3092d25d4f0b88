//! Raw record normalisation: prices, names, links, identifiers.
//!
//! Turns one adapter's [`Extraction`] into a [`SourceResult`]. Records with
//! neither a name nor a price are dropped; repeated listings of the same
//! product within the source are collapsed to the first occurrence.

use std::collections::HashSet;

use url::Url;
use uuid::Uuid;

use crate::adapter::Extraction;
use crate::types::{Price, Product, RawRecord, SourceInfo, SourceResult};

use super::url_normalize::normalize_url;

/// Display name for a priced record the storefront left untitled.
pub const UNNAMED_PRODUCT: &str = "Unnamed product";

/// Price texts containing any of these (case-insensitive) are unavailable.
const UNAVAILABLE_MARKERS: &[&str] = &[
    "out of stock",
    "stock out",
    "unavailable",
    "upcoming",
    "call for price",
];

const CURRENCY_SYMBOLS: &[char] = &['৳', '$', '€', '£', '₹'];

/// Normalise displayed price text.
///
/// The first numeric run is the amount. The display form keeps the run's
/// separators and the detected currency symbol; the numeric value drops
/// thousands separators. Text without a positive amount, or carrying an
/// unavailability marker, is [`Price::OutOfStock`].
///
/// ```
/// use pricegear_scrape::pipeline::normalize::normalize_price;
///
/// assert_eq!(normalize_price("1,200").display(), "1,200");
/// assert_eq!(normalize_price("Tk 3,450.00").value(), Some(3450.0));
/// assert!(!normalize_price("Stock Out").is_in_stock());
/// ```
pub fn normalize_price(text: &str) -> Price {
    let lowered = text.to_lowercase();
    if UNAVAILABLE_MARKERS.iter().any(|m| lowered.contains(m)) {
        return Price::OutOfStock;
    }

    let Some(run) = numeric_run(text) else {
        return Price::OutOfStock;
    };
    let value = match run.replace(',', "").parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => return Price::OutOfStock,
    };

    let display = match currency_symbol(text, &lowered) {
        Some(symbol) => format!("{symbol}{run}"),
        None => run.to_string(),
    };
    Price::Amount { display, value }
}

/// The first digit-led run of digits and separators, trailing separators trimmed.
fn numeric_run(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.'))
        .unwrap_or(rest.len());
    let run = rest[..end].trim_end_matches([',', '.']);
    (!run.is_empty()).then_some(run)
}

fn currency_symbol(text: &str, lowered: &str) -> Option<char> {
    if let Some(symbol) = text.chars().find(|c| CURRENCY_SYMBOLS.contains(c)) {
        return Some(symbol);
    }
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .map(|word| word.trim_matches(|c: char| c.is_ascii_digit()))
        .any(|word| word == "tk" || word == "bdt")
        .then_some('৳')
}

/// Collapse whitespace; blank names become `None`.
pub fn normalize_name(raw: Option<&str>) -> Option<String> {
    let name = raw?.split_whitespace().collect::<Vec<_>>().join(" ");
    (!name.is_empty()).then_some(name)
}

/// Resolve a link or image reference against the storefront root.
///
/// Protocol-relative references get `https:`. Anything that does not end
/// up as an absolute `http(s)` URL (`javascript:`, inline `data:` images,
/// bare fragments) is discarded.
pub fn resolve_link(base: &Url, raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    let resolved = if let Some(rest) = raw.strip_prefix("//") {
        Url::parse(&format!("https://{rest}")).ok()?
    } else {
        base.join(raw).ok()?
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Normalise one record; `None` when it has neither name nor price.
pub fn normalize_record(info: &SourceInfo, record: &RawRecord) -> Option<Product> {
    let name = normalize_name(record.name.as_deref());
    let price_text = record
        .price_text
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    if name.is_none() && price_text.is_none() {
        return None;
    }

    Some(Product {
        id: Uuid::new_v4(),
        name: name.unwrap_or_else(|| UNNAMED_PRODUCT.to_string()),
        price: price_text.map_or(Price::OutOfStock, normalize_price),
        image_url: resolve_link(&info.base_url, record.image.as_deref()),
        product_url: resolve_link(&info.base_url, record.link.as_deref()),
        source: info.name.clone(),
    })
}

/// Normalise everything one adapter extracted.
///
/// The page-advertised logo, when present and resolvable, replaces the
/// static one.
pub fn normalize_source(info: &SourceInfo, extraction: &Extraction) -> SourceResult {
    let logo_url = resolve_link(&info.base_url, extraction.logo_url.as_deref())
        .unwrap_or_else(|| info.logo_url.clone());

    let total = extraction.records.len();
    let mut seen = HashSet::new();
    let mut products = Vec::with_capacity(total);
    for product in extraction
        .records
        .iter()
        .filter_map(|record| normalize_record(info, record))
    {
        let key = match &product.product_url {
            Some(url) => format!("url:{}", normalize_url(url)),
            None => format!("name:{}", product.name.to_lowercase()),
        };
        if seen.insert(key) {
            products.push(product);
        }
    }

    tracing::debug!(
        source = %info.name,
        raw = total,
        kept = products.len(),
        "source normalised"
    );
    SourceResult {
        source: info.name.clone(),
        logo_url,
        products,
    }
}

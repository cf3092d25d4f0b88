//! Product URL canonicalisation for within-source deduplication.
//!
//! Storefront listings often link the same product twice: once from the
//! image, once from the title, sometimes with the search term or tracking
//! parameters carried along. Canonical forms compare equal.

use url::Url;

/// Query parameters that never identify a product.
///
/// The OpenCart storefronts carry the search form state (`search`,
/// `description`, `tag`) into product links.
const NOISE_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "srsltid",
    "ref",
    "search",
    "description",
    "tag",
];

/// Canonicalise a product URL.
///
/// 1. Remove the fragment.
/// 2. Remove default ports.
/// 3. Drop noise parameters and sort the rest by key.
/// 4. Remove a trailing slash from the path (unless the path is `"/"`).
///
/// Scheme and host are lowercased by parsing. Input that does not parse
/// is returned unchanged.
///
/// # Examples
///
/// ```
/// use pricegear_scrape::pipeline::url_normalize::normalize_url;
///
/// let a = normalize_url("https://Shop.test/index.php?route=product/product&product_id=7&search=ssd");
/// let b = normalize_url("https://shop.test/index.php?product_id=7&route=product/product#reviews");
/// assert_eq!(a, b);
/// ```
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    parsed.set_fragment(None);

    if is_default_port(&parsed) {
        let _ = parsed.set_port(None);
    }

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !NOISE_PARAMS.contains(&key.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    if params.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(params);
    }

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(&path[..path.len() - 1]);
    }

    parsed.to_string()
}

fn is_default_port(url: &Url) -> bool {
    matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    )
}

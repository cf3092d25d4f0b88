//! Flattening of aggregate responses for an external catalogue.
//!
//! Product identifiers are fresh on every scrape, so a durable catalogue
//! keys rows by [`CatalogKey`] instead: the source name plus the
//! case-folded, whitespace-collapsed product name. This crate never writes
//! the rows anywhere itself.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AggregateResponse, SearchQuery};

/// Stable business key of a catalogue row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogKey {
    /// Storefront name.
    pub source: String,
    /// Case-folded, whitespace-collapsed product name.
    pub normalized_name: String,
}

impl CatalogKey {
    /// Build the key for a product name listed by `source`.
    pub fn new(source: &str, name: &str) -> Self {
        Self {
            source: source.to_string(),
            normalized_name: name
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase(),
        }
    }
}

/// One upsertable catalogue row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    /// Upsert key.
    pub key: CatalogKey,
    /// Display name as scraped.
    pub name: String,
    /// Price display string or the out-of-stock sentinel.
    pub price: String,
    /// Numeric price, absent when out of stock.
    pub price_value: Option<f64>,
    /// Whether the product had a resolvable price.
    pub in_stock: bool,
    /// Absolute image URL.
    pub image_url: Option<String>,
    /// Absolute product page URL.
    pub product_url: Option<String>,
    /// Storefront logo.
    pub source_logo_url: String,
    /// Normalised search term that found the product.
    pub search_term: String,
    /// When the aggregate was produced.
    pub scraped_at: DateTime<Utc>,
}

/// Flatten `response` into rows, keeping the first row per [`CatalogKey`].
pub fn catalog_rows(
    response: &AggregateResponse,
    term: &SearchQuery,
    scraped_at: DateTime<Utc>,
) -> Vec<CatalogRow> {
    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(response.product_count());
    for group in &response.results {
        for product in &group.products {
            let key = CatalogKey::new(&group.source, &product.name);
            if !seen.insert(key.clone()) {
                continue;
            }
            rows.push(CatalogRow {
                key,
                name: product.name.clone(),
                price: product.price.display().to_string(),
                price_value: product.price.value(),
                in_stock: product.price.is_in_stock(),
                image_url: product.image_url.clone(),
                product_url: product.product_url.clone(),
                source_logo_url: group.logo_url.clone(),
                search_term: term.as_str().to_string(),
                scraped_at,
            });
        }
    }
    rows
}

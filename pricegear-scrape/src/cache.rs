//! Short-lived in-memory cache of aggregate responses.
//!
//! Keyed by the normalised [`SearchQuery`], so `"Gaming  Mouse"` and
//! `"gaming mouse"` share an entry. Entries expire by TTL only. Uses
//! [`moka`] for async-friendly caching with automatic eviction.
//!
//! Concurrent misses for the same query are not coalesced: each runs the
//! full pipeline and the last insert wins.

use std::time::Duration;

use moka::future::Cache;

use crate::types::{AggregateResponse, SearchQuery};

/// Query cache owned by one [`crate::PriceAggregator`].
#[derive(Clone)]
pub struct QueryCache {
    inner: Option<Cache<SearchQuery, AggregateResponse>>,
    ttl: Duration,
}

impl QueryCache {
    /// Create a cache whose entries live for `ttl`. A zero TTL disables caching.
    pub fn new(ttl: Duration) -> Self {
        let inner = (!ttl.is_zero()).then(|| Cache::builder().time_to_live(ttl).build());
        Self { inner, ttl }
    }

    /// Whether lookups can ever hit.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a fresh entry.
    pub async fn get(&self, query: &SearchQuery) -> Option<AggregateResponse> {
        self.inner.as_ref()?.get(query).await
    }

    /// Store a response. Empty responses are not stored, so a transient
    /// outage of every storefront is retried on the next request.
    ///
    /// Returns whether the response was stored.
    pub async fn insert(&self, query: SearchQuery, response: AggregateResponse) -> bool {
        let Some(cache) = &self.inner else {
            return false;
        };
        if response.is_empty() {
            return false;
        }
        cache.insert(query, response).await;
        true
    }

    /// Number of live entries.
    pub async fn entry_count(&self) -> u64 {
        match &self.inner {
            Some(cache) => {
                cache.run_pending_tasks().await;
                cache.entry_count()
            }
            None => 0,
        }
    }

    /// Drop every entry.
    pub async fn invalidate_all(&self) {
        if let Some(cache) = &self.inner {
            cache.invalidate_all();
            cache.run_pending_tasks().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Price, Product, SourceResult};
    use uuid::Uuid;

    fn response(product: &str) -> AggregateResponse {
        AggregateResponse {
            results: vec![SourceResult {
                source: "StarTech".into(),
                logo_url: "logo".into(),
                products: vec![Product {
                    id: Uuid::new_v4(),
                    name: product.into(),
                    price: Price::OutOfStock,
                    image_url: None,
                    product_url: None,
                    source: "StarTech".into(),
                }],
            }],
        }
    }

    fn query(term: &str) -> SearchQuery {
        SearchQuery::new(term).expect("valid")
    }

    #[tokio::test]
    async fn miss_returns_none() {
        let cache = QueryCache::new(Duration::from_secs(60));
        assert!(cache.get(&query("nothing here")).await.is_none());
    }

    #[tokio::test]
    async fn hit_is_shared_across_spellings() {
        let cache = QueryCache::new(Duration::from_secs(60));
        assert!(cache.insert(query("Gaming Mouse"), response("G102")).await);
        let hit = cache.get(&query("  gaming   MOUSE")).await.expect("hit");
        assert_eq!(hit.results[0].products[0].name, "G102");
        assert_eq!(cache.entry_count().await, 1);
    }

    #[tokio::test]
    async fn empty_response_not_stored() {
        let cache = QueryCache::new(Duration::from_secs(60));
        assert!(!cache.insert(query("ssd"), AggregateResponse::default()).await);
        assert!(cache.get(&query("ssd")).await.is_none());
    }

    #[tokio::test]
    async fn last_write_wins() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.insert(query("ram"), response("old")).await;
        cache.insert(query("ram"), response("new")).await;
        let hit = cache.get(&query("ram")).await.expect("hit");
        assert_eq!(hit.results[0].products[0].name, "new");
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = QueryCache::new(Duration::from_millis(100));
        cache.insert(query("psu"), response("650W")).await;
        assert!(cache.get(&query("psu")).await.is_some());
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(cache.get(&query("psu")).await.is_none());
    }

    #[tokio::test]
    async fn zero_ttl_disables_cache() {
        let cache = QueryCache::new(Duration::ZERO);
        assert!(!cache.is_enabled());
        assert!(!cache.insert(query("cpu"), response("5600X")).await);
        assert!(cache.get(&query("cpu")).await.is_none());
        assert_eq!(cache.entry_count().await, 0);
    }

    #[tokio::test]
    async fn invalidate_all_clears() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.insert(query("gpu"), response("4060")).await;
        cache.invalidate_all().await;
        assert!(cache.get(&query("gpu")).await.is_none());
        assert_eq!(cache.entry_count().await, 0);
    }
}

//! Caching layer for fragment payloads to reduce upstream API calls

use cached::{Cached, TimedCache};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Cache key for a fragment-data request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    /// Ticker symbol ("MACRO" for ticker-independent data)
    pub ticker: String,
    /// Endpoint or fragment name
    pub endpoint: String,
    /// Additional parameters as a JSON string
    pub params: String,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(
        ticker: impl Into<String>,
        endpoint: impl Into<String>,
        params: impl Serialize,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            endpoint: endpoint.into(),
            params: serde_json::to_string(&params).unwrap_or_default(),
        }
    }
}

/// Thread-safe TTL cache for fragment payloads
pub struct FragmentCache {
    cache: Arc<RwLock<TimedCache<CacheKey, serde_json::Value>>>,
}

impl FragmentCache {
    /// Create a new cache with the specified TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(RwLock::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Get a value from the cache
    pub async fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let mut cache = self.cache.write().await;
        cache.cache_get(key).cloned()
    }

    /// Insert a value into the cache
    pub async fn insert(&self, key: CacheKey, value: serde_json::Value) {
        let mut cache = self.cache.write().await;
        let _ = cache.cache_set(key, value);
    }

    /// Get or fetch a value using the provided fetcher
    ///
    /// A cache hit short-circuits; a miss runs the fetcher and caches its
    /// result.
    pub async fn get_or_fetch<F, Fut, E>(
        &self,
        key: CacheKey,
        fetcher: F,
    ) -> std::result::Result<serde_json::Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<serde_json::Value, E>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!(?key, "fragment cache hit");
            return Ok(value);
        }

        tracing::debug!(?key, "fragment cache miss");

        let value = fetcher().await?;
        self.insert(key, value.clone()).await;

        Ok(value)
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        cache.cache_clear();
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        let cache = self.cache.read().await;
        cache.cache_size()
    }

    /// Whether the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Clone for FragmentCache {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

/// Tiered caches for the different fragment families
pub struct CacheTiers {
    /// Quotes and price history (short TTL)
    pub quotes: FragmentCache,
    /// Reference data: metrics, filings, calendars (long TTL)
    pub reference: FragmentCache,
    /// News and sentiment (medium TTL)
    pub news: FragmentCache,
}

impl CacheTiers {
    /// Create tiers with the specified TTLs
    pub fn new(quotes_ttl: Duration, reference_ttl: Duration, news_ttl: Duration) -> Self {
        Self {
            quotes: FragmentCache::new(quotes_ttl),
            reference: FragmentCache::new(reference_ttl),
            news: FragmentCache::new(news_ttl),
        }
    }

    /// Clear every tier
    pub async fn clear_all(&self) {
        self.quotes.clear().await;
        self.reference.clear().await;
        self.news.clear().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_cache_key_creation() {
        let key = CacheKey::new("AAPL", "price_chart", json!({"range": "3mo"}));
        assert_eq!(key.ticker, "AAPL");
        assert_eq!(key.endpoint, "price_chart");
        assert!(key.params.contains("range"));
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = FragmentCache::new(Duration::from_secs(60));
        let key = CacheKey::new("AAPL", "quote", json!({}));
        let value = json!({"close": 212.4});

        cache.insert(key.clone(), value.clone()).await;
        assert_eq!(cache.get(&key).await, Some(value));
    }

    #[tokio::test]
    async fn test_get_or_fetch_uses_cache_on_second_call() {
        let cache = FragmentCache::new(Duration::from_secs(60));
        let key = CacheKey::new("AAPL", "quote", json!({}));
        let value = json!({"close": 212.4});

        let mut calls = 0;
        let result = cache
            .get_or_fetch(key.clone(), || {
                calls += 1;
                async { Ok::<_, String>(value.clone()) }
            })
            .await
            .unwrap();
        assert_eq!(result, value);
        assert_eq!(calls, 1);

        let result = cache
            .get_or_fetch(key, || {
                calls += 1;
                async { Ok::<_, String>(value.clone()) }
            })
            .await
            .unwrap();
        assert_eq!(result, value);
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = FragmentCache::new(Duration::from_secs(60));
        for i in 0..4 {
            cache
                .insert(CacheKey::new(format!("T{i}"), "quote", json!({})), json!(i))
                .await;
        }
        assert_eq!(cache.len().await, 4);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_tiers_are_independent() {
        let tiers = CacheTiers::new(
            Duration::from_secs(60),
            Duration::from_secs(3600),
            Duration::from_secs(300),
        );
        let key = CacheKey::new("AAPL", "quote", json!({}));

        tiers.quotes.insert(key.clone(), json!(1)).await;
        assert_eq!(tiers.quotes.len().await, 1);
        assert!(tiers.reference.is_empty().await);

        tiers.clear_all().await;
        assert!(tiers.quotes.is_empty().await);
    }
}

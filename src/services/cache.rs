use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::models::CandidateBatch;
use crate::services::{CatalogProvider, StoreError};

/// In-process catalog snapshot cache.
///
/// The catalog is refreshed by a batch pipeline, so a short-lived snapshot can
/// serve consecutive ranking requests without re-fetching every row.
pub struct CachedCatalog {
    inner: Arc<dyn CatalogProvider>,
    cache: moka::future::Cache<String, CandidateBatch>,
}

impl CachedCatalog {
    pub fn new(inner: Arc<dyn CatalogProvider>, max_entries: u64, ttl_secs: u64) -> Self {
        let cache = moka::future::CacheBuilder::new(max_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { inner, cache }
    }

    /// Drop every cached snapshot, e.g. after a catalog refresh
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
        tracing::debug!("Catalog cache invalidated");
    }
}

#[async_trait]
impl CatalogProvider for CachedCatalog {
    async fn fetch_candidates(&self, limit: usize) -> Result<CandidateBatch, StoreError> {
        let key = CacheKey::catalog(limit);

        if let Some(batch) = self.cache.get(&key).await {
            tracing::trace!("Catalog cache hit: {}", key);
            return Ok(batch);
        }

        tracing::trace!("Catalog cache miss: {}", key);
        let batch = self.inner.fetch_candidates(limit).await?;
        self.cache.insert(key, batch.clone()).await;
        Ok(batch)
    }
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a catalog snapshot of a given size
    pub fn catalog(limit: usize) -> String {
        format!("catalog:{}", limit)
    }
}

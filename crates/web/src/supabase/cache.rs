//! Cache for anonymous listing reads.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

/// Raw JSON responses keyed by `table|query`.
///
/// Values stay as JSON so one cache serves every row type; callers
/// deserialize on the way out.
#[derive(Clone)]
pub struct ListingCache {
    cache: Cache<String, Arc<serde_json::Value>>,
}

impl ListingCache {
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(ttl)
            .support_invalidation_closures()
            .build();
        Self { cache }
    }

    pub fn key(table: &str, params: &str) -> String {
        format!("{table}|{params}")
    }

    pub async fn get(&self, key: &str) -> Option<Arc<serde_json::Value>> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: String, value: serde_json::Value) {
        self.cache.insert(key, Arc::new(value)).await;
    }

    /// Drop every cached read of `table`.
    pub fn invalidate_table(&self, table: &str) {
        let prefix = format!("{table}|");
        if let Err(e) = self
            .cache
            .invalidate_entries_if(move |key, _| key.starts_with(&prefix))
        {
            tracing::warn!(error = %e, table, "Failed to invalidate listing cache");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalidate_only_touches_one_table() {
        let cache = ListingCache::new(Duration::from_secs(60));
        let plots = ListingCache::key("land_listings", "select=*");
        let tools = ListingCache::key("equipment_listings", "select=*");
        cache.insert(plots.clone(), serde_json::json!([1])).await;
        cache.insert(tools.clone(), serde_json::json!([2])).await;

        cache.invalidate_table("land_listings");
        cache.cache.run_pending_tasks().await;

        assert!(cache.get(&plots).await.is_none());
        assert_eq!(*cache.get(&tools).await.unwrap(), serde_json::json!([2]));
    }
}

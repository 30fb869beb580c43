//! Lifetime-bounded, per-key memoization used by the TLS probes.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

struct Entry<V> {
    value: V,
    created_at: Instant,
}

/// Key → value store whose entries become absent once `lifetime` has elapsed.
///
/// Concurrent `get`/`set` for different keys never interfere. There is no
/// in-flight deduplication: two callers that miss on the same key both do the
/// work and the last `set` wins.
pub struct ExpiringCache<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
    lifetime: Duration,
}

impl<V: Clone> ExpiringCache<V> {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            lifetime,
        }
    }

    /// Returns the cached value, or `None` on a miss or an expired entry.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.created_at.elapsed() < self.lifetime)
            .map(|entry| entry.value.clone())
    }

    /// Stores `value`, resetting the expiry clock for `key`. Expired entries
    /// are dropped on the way.
    pub async fn set(&self, key: impl Into<String>, value: V) {
        let mut entries = self.entries.write().await;
        let lifetime = self.lifetime;
        entries.retain(|_, entry| entry.created_at.elapsed() < lifetime);
        entries.insert(
            key.into(),
            Entry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    /// Drops every expired entry and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at.elapsed() < self.lifetime);
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until the next `set`
    /// or purge.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_get_before_and_after_expiry() {
        let cache = ExpiringCache::new(Duration::from_secs(60));
        cache.set("mx.example.com", vec!["ok".to_string()]).await;

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(
            cache.get("mx.example.com").await,
            Some(vec!["ok".to_string()])
        );

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("mx.example.com").await, None);
    }

    #[tokio::test]
    async fn test_miss_on_unknown_key() {
        let cache: ExpiringCache<Vec<String>> = ExpiringCache::new(Duration::from_secs(60));
        assert_eq!(cache.get("example.com").await, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_resets_clock() {
        let cache = ExpiringCache::new(Duration::from_secs(10));
        cache.set("example.com", 1).await;
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set("example.com", 2).await;
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get("example.com").await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = ExpiringCache::new(Duration::from_secs(10));
        cache.set("old.example.com", 1).await;
        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_evicts_expired_entries() {
        let cache = ExpiringCache::new(Duration::from_secs(10));
        cache.set("a.example.com", 1).await;
        cache.set("b.example.com", 2).await;
        tokio::time::advance(Duration::from_secs(6)).await;
        cache.set("c.example.com", 3).await;
        assert_eq!(cache.len().await, 3);

        tokio::time::advance(Duration::from_secs(5)).await;
        cache.set("d.example.com", 4).await;
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("a.example.com").await, None);
        assert_eq!(cache.get("c.example.com").await, Some(3));
        assert_eq!(cache.get("d.example.com").await, Some(4));
    }
}

//! TTL cache for directory lookups.
//!
//! Values are partitioned into one bucket per value type, so an identity list and a
//! project list stored under the same string key never collide. Loading is
//! single-flight: concurrent misses on the same key join one producer call.

use crate::types::{BotUser, Identity, Project};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// A type that can live in the cache. `KIND` names its bucket in key listings.
pub trait CacheValue: Clone + Send + Sync + 'static {
    const KIND: &'static str;
}

impl CacheValue for Vec<Identity> {
    const KIND: &'static str = "identities";
}

impl CacheValue for Vec<Project> {
    const KIND: &'static str = "projects";
}

impl CacheValue for Vec<BotUser> {
    const KIND: &'static str = "bots";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Upper bound on entries per bucket.
    pub max_size: usize,
    /// Lifetime of an entry, counted from when it was written.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 10_000,
            ttl: Duration::from_secs(900),
        }
    }
}

/// A live entry as seen from outside: bucket name plus string key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CacheKey {
    pub kind: &'static str,
    pub key: String,
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    written_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

struct Bucket<V> {
    entries: DashMap<String, CacheEntry<V>>,
    loading: DashMap<String, Arc<OnceCell<Option<V>>>>,
}

impl<V: CacheValue> Bucket<V> {
    fn new() -> Self {
        Self {
            entries: DashMap::new(),
            loading: DashMap::new(),
        }
    }

    fn fresh(&self, key: &str, now: DateTime<Utc>) -> Option<V> {
        let hit = self
            .entries
            .get(key)
            .map(|entry| entry.is_live(now).then(|| entry.value.clone()));
        match hit {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.entries.remove_if(key, |_, entry| !entry.is_live(now));
                None
            }
            None => None,
        }
    }

    fn store(&self, key: &str, value: V, config: CacheConfig) {
        let written_at = Utc::now();
        let expires_at = ChronoDuration::from_std(config.ttl)
            .ok()
            .and_then(|ttl| written_at.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                written_at,
                expires_at,
            },
        );
        if self.entries.len() > config.max_size {
            self.evict(config.max_size, written_at);
        }
    }

    /// Drops expired entries first, then the oldest writes until the bucket fits.
    fn evict(&self, max_size: usize, now: DateTime<Utc>) {
        self.entries.retain(|_, entry| entry.is_live(now));
        while self.entries.len() > max_size {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.written_at)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

/// Type-erased view of a bucket, used by the key listing and invalidation paths.
trait ErasedBucket: Send + Sync {
    fn kind(&self) -> &'static str;
    fn live_keys(&self, now: DateTime<Utc>) -> Vec<String>;
    fn expires_at(&self, key: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>>;
    fn invalidate(&self, key: &str);
    fn clear(&self);
    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<V: CacheValue> ErasedBucket for Bucket<V> {
    fn kind(&self) -> &'static str {
        V::KIND
    }

    fn live_keys(&self, now: DateTime<Utc>) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.key().clone())
            .collect()
    }

    fn expires_at(&self, key: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.expires_at)
    }

    fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Shared memoizer for directory lookups.
pub struct CacheLayer {
    config: CacheConfig,
    buckets: DashMap<TypeId, Arc<dyn ErasedBucket>>,
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("config", &self.config)
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

impl Default for CacheLayer {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl CacheLayer {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
        }
    }

    pub fn config(&self) -> CacheConfig {
        self.config
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    fn bucket<V: CacheValue>(&self) -> Option<Arc<Bucket<V>>> {
        let erased = self
            .buckets
            .entry(TypeId::of::<V>())
            .or_insert_with(|| {
                let bucket: Arc<dyn ErasedBucket> = Arc::new(Bucket::<V>::new());
                bucket
            })
            .value()
            .clone();
        erased.as_any().downcast::<Bucket<V>>().ok()
    }

    /// Returns the cached value for `key`, running `producer` on a miss.
    ///
    /// Concurrent callers missing on the same key wait for a single producer run.
    /// A producer error is logged and yields `None`; nothing is stored for it.
    pub async fn get<V, F, Fut, E>(&self, key: &str, producer: F) -> Option<V>
    where
        V: CacheValue,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Display,
    {
        let bucket = self.bucket::<V>()?;
        if let Some(value) = bucket.fresh(key, Utc::now()) {
            debug!(kind = V::KIND, key, "cache hit");
            return Some(value);
        }

        let cell = bucket
            .loading
            .entry(key.to_string())
            .or_default()
            .value()
            .clone();
        let config = self.config;
        let result = cell
            .get_or_init(|| {
                let bucket = Arc::clone(&bucket);
                let key = key.to_string();
                async move {
                    // Another flight may have finished between the miss and this point.
                    if let Some(value) = bucket.fresh(&key, Utc::now()) {
                        return Some(value);
                    }
                    debug!(kind = V::KIND, key = %key, "cache miss, loading");
                    match producer().await {
                        Ok(value) => {
                            bucket.store(&key, value.clone(), config);
                            Some(value)
                        }
                        Err(err) => {
                            warn!(kind = V::KIND, key = %key, error = %err, "cache producer failed");
                            None
                        }
                    }
                }
            })
            .await
            .clone();

        bucket
            .loading
            .remove_if(key, |_, current| Arc::ptr_eq(current, &cell));
        result
    }

    /// All unexpired keys, ordered by bucket then key.
    pub fn keys(&self) -> Vec<CacheKey> {
        let now = Utc::now();
        let mut keys: Vec<CacheKey> = self
            .buckets
            .iter()
            .flat_map(|bucket| {
                let kind = bucket.kind();
                bucket
                    .live_keys(now)
                    .into_iter()
                    .map(move |key| CacheKey { kind, key })
            })
            .collect();
        keys.sort();
        keys
    }

    pub fn expires_at(&self, key: &CacheKey) -> Option<DateTime<Utc>> {
        let now = Utc::now();
        self.buckets
            .iter()
            .filter(|bucket| bucket.kind() == key.kind)
            .find_map(|bucket| bucket.expires_at(&key.key, now))
    }

    /// Removes `key` from every bucket.
    pub fn invalidate(&self, key: &str) {
        for bucket in self.buckets.iter() {
            bucket.invalidate(key);
        }
    }

    pub fn invalidate_all(&self) {
        for bucket in self.buckets.iter() {
            bucket.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn project(id: &str) -> Project {
        Project::new(id, id)
    }

    async fn load_projects(cache: &CacheLayer, key: &str, calls: &AtomicUsize) -> Option<Vec<Project>> {
        cache
            .get(key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(vec![project(key)])
            })
            .await
    }

    #[tokio::test]
    async fn hit_skips_producer() {
        let cache = CacheLayer::default();
        let calls = AtomicUsize::new(0);

        let first = load_projects(&cache, "all", &calls).await;
        let second = load_projects(&cache, "all", &calls).await;

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_reloaded() {
        let cache = CacheLayer::new(CacheConfig {
            max_size: 10,
            ttl: Duration::from_millis(20),
        });
        let calls = AtomicUsize::new(0);

        load_projects(&cache, "all", &calls).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.keys().is_empty());
        load_projects(&cache, "all", &calls).await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn producer_failure_is_not_cached() {
        let cache = CacheLayer::default();

        let failed: Option<Vec<Project>> = cache
            .get("all", || async { Err::<Vec<Project>, _>("directory down") })
            .await;
        assert!(failed.is_none());
        assert!(cache.keys().is_empty());

        let calls = AtomicUsize::new(0);
        let loaded = load_projects(&cache, "all", &calls).await;
        assert_eq!(loaded.map(|p| p.len()), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_results_are_cached() {
        let cache = CacheLayer::default();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let identities: Option<Vec<Identity>> = cache
                .get("nobody@example.org", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(Vec::new())
                })
                .await;
            assert_eq!(identities, Some(Vec::new()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn value_types_use_separate_buckets() {
        let cache = CacheLayer::default();

        let projects: Option<Vec<Project>> = cache
            .get("shared", || async { Ok::<_, String>(vec![project("p")]) })
            .await;
        let bots: Option<Vec<BotUser>> = cache
            .get("shared", || async { Ok::<_, String>(Vec::new()) })
            .await;

        assert_eq!(projects.map(|p| p.len()), Some(1));
        assert_eq!(bots.map(|b| b.len()), Some(0));
        assert_eq!(
            cache.keys(),
            vec![
                CacheKey { kind: "bots", key: "shared".to_string() },
                CacheKey { kind: "projects", key: "shared".to_string() },
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_run_one_producer() {
        let cache = Arc::new(CacheLayer::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let lookups = (0..32).map(|_| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get("all", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<_, String>(vec![project("all")])
                    })
                    .await
            })
        });
        let results = futures::future::join_all(lookups).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap().map(|p| p.len()), Some(1));
        }
    }

    #[tokio::test]
    async fn size_bound_evicts_oldest_write() {
        let cache = CacheLayer::new(CacheConfig {
            max_size: 2,
            ttl: Duration::from_secs(60),
        });
        let calls = AtomicUsize::new(0);

        for key in ["a", "b", "c"] {
            load_projects(&cache, key, &calls).await;
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let keys: Vec<String> = cache.keys().into_iter().map(|k| k.key).collect();
        assert_eq!(keys, vec!["b".to_string(), "c".to_string()]);
    }

    #[tokio::test]
    async fn invalidation_and_expiry_lookup() {
        let cache = CacheLayer::default();
        let calls = AtomicUsize::new(0);
        load_projects(&cache, "a", &calls).await;
        load_projects(&cache, "b", &calls).await;

        let key = CacheKey { kind: "projects", key: "a".to_string() };
        let expires = cache.expires_at(&key).unwrap();
        assert!(expires > Utc::now());
        assert!(expires <= Utc::now() + ChronoDuration::seconds(900));

        cache.invalidate("a");
        assert!(cache.expires_at(&key).is_none());
        assert_eq!(cache.keys().len(), 1);

        cache.invalidate_all();
        assert!(cache.keys().is_empty());

        load_projects(&cache, "a", &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}

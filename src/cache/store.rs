//! Main cache store: expiry, oldest-first eviction and snapshot persistence

use crate::cache::{
    config::CacheConfig,
    entry::CacheEntry,
    key::derive_key,
    search::Validator,
    snapshot::Snapshot,
    types::{CacheCounters, CacheKey, CacheStats},
};
use crate::error::Result;
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Smallest TTL accepted for a single insert; keeps `expires_at > created_at`
const MIN_TTL: Duration = Duration::from_millis(1);

/// Memoizing front-end for a slow lookup, keyed by `(subject, source)`.
///
/// This implementation provides:
/// - TTL expiry checked on every read
/// - Oldest-first eviction once `max_size` entries are resident
/// - Whole-file JSON snapshots, reloaded at construction
/// - Write-through [`search_with_cache`](Self::search_with_cache)
///
/// Every operation holds the internal lock for its full duration, so callers
/// and the background sweep never observe a partially updated store.
pub struct LookupCache<T> {
    /// Cache configuration
    pub(crate) config: CacheConfig,

    /// Internal storage
    store: RwLock<CacheStore<T>>,

    snapshot: Snapshot,

    /// Decides which lookup results are worth caching
    pub(crate) validator: Validator<T>,
}

/// Internal cache storage
struct CacheStore<T> {
    /// Main storage: key -> entry
    entries: HashMap<CacheKey, CacheEntry<T>>,

    counters: CacheCounters,
}

impl<T> LookupCache<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Create a cache, hydrating it from the configured snapshot.
    ///
    /// Only an invalid configuration fails; an unreadable snapshot is logged
    /// and the cache starts empty. Every lookup result is considered cacheable
    /// until a validator is installed with
    /// [`with_validator`](Self::with_validator).
    pub async fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        info!("Initializing lookup cache with config: {:?}", config);

        let snapshot = Snapshot::new(&config.cache_file);
        let mut entries = HashMap::new();

        if config.persist {
            match snapshot.load(Utc::now()).await {
                Ok(loaded) => {
                    info!("Restored {} entries from {:?}", loaded.len(), snapshot.path());
                    entries = loaded;
                }
                Err(e) => {
                    warn!("Could not load cache snapshot {:?}: {}", snapshot.path(), e);
                }
            }
        }

        let mut store = CacheStore {
            entries,
            counters: CacheCounters::default(),
        };
        // A snapshot written under a larger max_size must not exceed the bound
        while store.entries.len() > config.max_size {
            if evict_oldest_in(&mut store.entries).is_none() {
                break;
            }
            store.counters.evictions += 1;
        }

        Ok(Self {
            config,
            store: RwLock::new(store),
            snapshot,
            validator: Arc::new(|_: &T| true),
        })
    }

    /// Replace the predicate deciding which lookup results get cached
    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.validator = Arc::new(validator);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn snapshot_path(&self) -> &Path {
        self.snapshot.path()
    }

    /// Get a cached value.
    ///
    /// An expired entry is removed and reported as a miss.
    pub async fn get(&self, subject: &str, source: &str) -> Option<T> {
        let key = derive_key(subject, source);
        let now = Utc::now();
        let mut guard = self.store.write().await;
        let store = &mut *guard;

        match store.entries.get_mut(&key) {
            Some(entry) if !entry.is_expired_at(now) => {
                entry.mark_accessed();
                store.counters.hits += 1;
                debug!("Cache hit: {}", key);
                return Some(entry.data.clone());
            }
            Some(_) => debug!("Cache entry expired: {}", key),
            None => {
                debug!("Cache miss: {}", key);
                store.counters.misses += 1;
                return None;
            }
        }

        store.entries.remove(&key);
        store.counters.misses += 1;
        store.counters.expired_removals += 1;
        None
    }

    /// Insert a value with the configured default TTL
    pub async fn set(&self, subject: &str, data: T, source: &str) {
        self.set_with_ttl(subject, data, source, None).await
    }

    /// Insert a value, optionally overriding the TTL for this entry.
    ///
    /// At capacity, the oldest entry is evicted first unless `subject` is
    /// already cached, in which case it is simply overwritten.
    pub async fn set_with_ttl(&self, subject: &str, data: T, source: &str, ttl: Option<Duration>) {
        let ttl = match ttl {
            Some(ttl) => ttl.max(MIN_TTL),
            None => self.config.ttl_with_jitter(),
        };
        let key = derive_key(subject, source);

        let mut guard = self.store.write().await;
        let store = &mut *guard;

        if !store.entries.contains_key(&key) {
            while store.entries.len() >= self.config.max_size {
                match evict_oldest_in(&mut store.entries) {
                    Some(evicted) => {
                        debug!("Evicting entry due to max_size limit: {}", evicted);
                        store.counters.evictions += 1;
                    }
                    None => break,
                }
            }
        }

        debug!("Caching {} for {:?}", key, ttl);
        store.entries.insert(key, CacheEntry::new(data, source, ttl));

        if store.entries.len() % self.config.snapshot_batch == 0 {
            self.persist(&store.entries).await;
        }
    }

    /// Evict the entry with the oldest creation time, returning its key
    pub async fn evict_oldest(&self) -> Option<CacheKey> {
        let mut store = self.store.write().await;
        let evicted = evict_oldest_in(&mut store.entries);
        if evicted.is_some() {
            store.counters.evictions += 1;
        }
        evicted
    }

    /// Remove every expired entry, returning how many were removed
    pub async fn cleanup(&self) -> usize {
        let now = Utc::now();
        let mut store = self.store.write().await;

        let before = store.entries.len();
        store.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - store.entries.len();

        if removed > 0 {
            store.counters.expired_removals += removed as u64;
            debug!("Cleaned up {} expired entries", removed);
            self.persist(&store.entries).await;
        }

        removed
    }

    /// Remove one entry. Returns whether anything was removed.
    pub async fn invalidate(&self, subject: &str, source: &str) -> bool {
        let key = derive_key(subject, source);
        let mut store = self.store.write().await;

        if store.entries.remove(&key).is_some() {
            store.counters.invalidations += 1;
            debug!("Invalidated cache entry: {}", key);
            self.persist(&store.entries).await;
            true
        } else {
            false
        }
    }

    /// Clear all entries from the cache
    pub async fn clear(&self) {
        let mut store = self.store.write().await;

        let count = store.entries.len();
        store.entries.clear();
        info!("Cleared {} entries from cache", count);

        self.persist(&store.entries).await;
    }

    /// Force a snapshot write. Returns `true` if the snapshot was written.
    pub async fn flush(&self) -> bool {
        // Write lock keeps concurrent snapshot writes ordered
        let store = self.store.write().await;
        self.persist(&store.entries).await
    }

    /// Report on the cache without purging anything
    pub async fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let store = self.store.read().await;

        let mut valid = 0usize;
        let mut valid_accesses = 0u64;
        for entry in store.entries.values() {
            if !entry.is_expired_at(now) {
                valid += 1;
                valid_accesses += entry.access_count;
            }
        }

        let average_access = if valid == 0 {
            0.0
        } else {
            valid_accesses as f64 / valid as f64
        };

        CacheStats {
            total: store.entries.len(),
            valid,
            expired: store.entries.len() - valid,
            average_access,
            memory_footprint: serde_json::to_vec(&store.entries)
                .map(|bytes| bytes.len())
                .unwrap_or(0),
            snapshot_path: self.snapshot.path().to_path_buf(),
            counters: store.counters,
        }
    }

    /// Whether an unexpired entry exists, without counting an access
    pub async fn contains(&self, subject: &str, source: &str) -> bool {
        let key = derive_key(subject, source);
        let store = self.store.read().await;
        store
            .entries
            .get(&key)
            .is_some_and(|entry| !entry.is_expired_at(Utc::now()))
    }

    /// Copy of every resident entry, sorted by key
    pub async fn entries(&self) -> Vec<(CacheKey, CacheEntry<T>)> {
        let store = self.store.read().await;
        let mut entries: Vec<_> = store
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Get number of entries in cache, expired ones included
    pub async fn len(&self) -> usize {
        self.store.read().await.entries.len()
    }

    /// Check if cache is empty
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.entries.is_empty()
    }

    /// Internal: write a snapshot, logging instead of failing
    async fn persist(&self, entries: &HashMap<CacheKey, CacheEntry<T>>) -> bool {
        if !self.config.persist {
            return false;
        }

        match self.snapshot.save(entries).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not write cache snapshot {:?}: {}", self.snapshot.path(), e);
                false
            }
        }
    }
}

/// Internal: remove the entry with the smallest `created_at`. Ties go to the
/// first one met in iteration order.
fn evict_oldest_in<T>(entries: &mut HashMap<CacheKey, CacheEntry<T>>) -> Option<CacheKey> {
    let oldest = entries
        .iter()
        .min_by_key(|(_, entry)| entry.created_at)
        .map(|(key, _)| key.clone())?;
    entries.remove(&oldest);
    Some(oldest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::DEFAULT_SOURCE;

    async fn memory_cache(max_size: usize) -> LookupCache<String> {
        let config = CacheConfig::builder()
            .default_ttl(Duration::from_secs(60))
            .max_size(max_size)
            .persist(false)
            .build();
        LookupCache::new(config).await.unwrap()
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = memory_cache(10).await;

        assert_eq!(cache.get("Hades", DEFAULT_SOURCE).await, None);
        cache.set("Hades", "hades.jpg".to_string(), DEFAULT_SOURCE).await;
        assert_eq!(
            cache.get("Hades", DEFAULT_SOURCE).await,
            Some("hades.jpg".to_string())
        );

        let stats = cache.stats().await;
        assert_eq!(stats.counters.hits, 1);
        assert_eq!(stats.counters.misses, 1);
    }

    #[tokio::test]
    async fn test_sources_are_separate_entries() {
        let cache = memory_cache(10).await;

        cache.set("Hades", "steam.jpg".to_string(), "steam").await;
        assert_eq!(cache.get("Hades", "igdb").await, None);
        assert_eq!(cache.get("hades", "steam").await, Some("steam.jpg".to_string()));
    }

    #[tokio::test]
    async fn test_expired_read_purges_entry() {
        let cache = memory_cache(10).await;

        cache
            .set_with_ttl("Hades", "hades.jpg".to_string(), DEFAULT_SOURCE, Some(Duration::from_millis(20)))
            .await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        // Still resident until something touches it
        assert_eq!(cache.stats().await.expired, 1);
        assert_eq!(cache.len().await, 1);

        assert_eq!(cache.get("Hades", DEFAULT_SOURCE).await, None);
        let stats = cache.stats().await;
        assert_eq!(stats.total, 0);
        assert_eq!(stats.counters.expired_removals, 1);
    }

    #[tokio::test]
    async fn test_zero_custom_ttl_is_clamped() {
        let cache = memory_cache(10).await;
        cache
            .set_with_ttl("Hades", "hades.jpg".to_string(), DEFAULT_SOURCE, Some(Duration::ZERO))
            .await;

        let entries = cache.entries().await;
        assert!(entries[0].1.expires_at > entries[0].1.created_at);
    }

    #[tokio::test]
    async fn test_evicts_oldest_at_capacity() {
        let cache = memory_cache(2).await;

        cache.set("A", "a".to_string(), DEFAULT_SOURCE).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.set("B", "b".to_string(), DEFAULT_SOURCE).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.set("C", "c".to_string(), DEFAULT_SOURCE).await;

        assert_eq!(cache.len().await, 2);
        assert!(!cache.contains("A", DEFAULT_SOURCE).await);
        assert!(cache.contains("B", DEFAULT_SOURCE).await);
        assert!(cache.contains("C", DEFAULT_SOURCE).await);
        assert_eq!(cache.stats().await.counters.evictions, 1);
    }

    #[tokio::test]
    async fn test_overwrite_at_capacity_keeps_other_entries() {
        let cache = memory_cache(2).await;

        cache.set("A", "a".to_string(), DEFAULT_SOURCE).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        cache.set("B", "b".to_string(), DEFAULT_SOURCE).await;
        cache.set("B", "b2".to_string(), DEFAULT_SOURCE).await;

        assert_eq!(cache.get("A", DEFAULT_SOURCE).await, Some("a".to_string()));
        assert_eq!(cache.get("B", DEFAULT_SOURCE).await, Some("b2".to_string()));
        assert_eq!(cache.stats().await.counters.evictions, 0);
    }

    #[tokio::test]
    async fn test_evict_oldest_on_empty_is_noop() {
        let cache = memory_cache(2).await;
        assert_eq!(cache.evict_oldest().await, None);

        cache.set("Celeste", "c".to_string(), DEFAULT_SOURCE).await;
        assert_eq!(cache.evict_oldest().await, Some("celeste_all".to_string()));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_expired() {
        let cache = memory_cache(10).await;

        cache
            .set_with_ttl("Old", "o".to_string(), DEFAULT_SOURCE, Some(Duration::from_millis(10)))
            .await;
        cache.set("Fresh", "f".to_string(), DEFAULT_SOURCE).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.cleanup().await, 1);
        assert_eq!(cache.cleanup().await, 0);
        assert_eq!(cache.len().await, 1);
        assert!(cache.contains("Fresh", DEFAULT_SOURCE).await);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = memory_cache(10).await;

        cache.set("Portal 2", "p2.jpg".to_string(), "steam").await;
        assert!(cache.invalidate("portal 2", "steam").await);
        assert!(!cache.invalidate("portal 2", "steam").await);
        assert_eq!(cache.get("Portal 2", "steam").await, None);
        assert_eq!(cache.stats().await.counters.invalidations, 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = memory_cache(10).await;

        cache.set("A", "a".to_string(), DEFAULT_SOURCE).await;
        cache.set("B", "b".to_string(), DEFAULT_SOURCE).await;
        cache.clear().await;

        assert_eq!(cache.len().await, 0);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_stats_average_access_over_valid_entries() {
        let cache = memory_cache(10).await;

        cache.set("A", "a".to_string(), DEFAULT_SOURCE).await;
        cache.set("B", "b".to_string(), DEFAULT_SOURCE).await;
        cache.get("A", DEFAULT_SOURCE).await;
        cache.get("A", DEFAULT_SOURCE).await;
        cache.get("A", DEFAULT_SOURCE).await;
        cache.get("B", DEFAULT_SOURCE).await;

        let stats = cache.stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.valid, 2);
        assert_eq!(stats.average_access, 2.0);
        assert!(stats.memory_footprint > 0);
    }

    #[tokio::test]
    async fn test_stats_on_empty_cache() {
        let stats = memory_cache(10).await.stats().await;
        assert_eq!(stats.total, 0);
        assert_eq!(stats.average_access, 0.0);
    }

    #[tokio::test]
    async fn test_flush_disabled_without_persistence() {
        let cache = memory_cache(10).await;
        assert!(!cache.flush().await);
    }

    #[tokio::test]
    async fn test_batch_snapshot_on_every_nth_insert() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let config = CacheConfig::builder()
            .cache_file(&path)
            .snapshot_batch(3)
            .build();
        let cache: LookupCache<String> = LookupCache::new(config).await.unwrap();

        cache.set("A", "a".to_string(), DEFAULT_SOURCE).await;
        cache.set("B", "b".to_string(), DEFAULT_SOURCE).await;
        assert!(!path.exists());

        cache.set("C", "c".to_string(), DEFAULT_SOURCE).await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_oversized_snapshot_is_trimmed_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let big = LookupCache::<String>::new(CacheConfig::builder().cache_file(&path).build())
            .await
            .unwrap();
        for name in ["A", "B", "C"] {
            big.set(name, name.to_lowercase(), DEFAULT_SOURCE).await;
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert!(big.flush().await);

        let small = LookupCache::<String>::new(
            CacheConfig::builder().cache_file(&path).max_size(2).build(),
        )
        .await
        .unwrap();
        assert_eq!(small.len().await, 2);
        assert!(!small.contains("A", DEFAULT_SOURCE).await);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = CacheConfig::builder().max_size(0).persist(false).build();
        assert!(LookupCache::<String>::new(config).await.is_err());
    }
}

//! Write-through search helper
//!
//! Wraps an external, possibly slow and fallible lookup so that completed
//! results are memoized. Only results accepted by the cache's [`Validator`]
//! are stored; there is no negative caching. Concurrent misses for the same
//! subject each run the lookup.

use crate::cache::store::LookupCache;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Predicate deciding whether a lookup result is worth caching
pub type Validator<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

impl<T> LookupCache<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Return the cached value for `(subject, source)`, or run `lookup` and
    /// cache its result when the validator accepts it.
    ///
    /// A failing lookup is logged and reported as `None`; nothing is cached
    /// and the error never reaches the caller. Results the validator rejects
    /// are returned as-is but not stored, so the next call looks up again.
    pub async fn search_with_cache<F, Fut, E>(
        &self,
        lookup: F,
        subject: &str,
        source: &str,
    ) -> Option<T>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Display,
    {
        if let Some(cached) = self.get(subject, source).await {
            return Some(cached);
        }

        let result = match lookup(subject.to_string()).await {
            Ok(result) => result?,
            Err(e) => {
                warn!("Lookup for {:?} ({}) failed: {}", subject, source, e);
                return None;
            }
        };

        if (self.validator)(&result) {
            self.set(subject, result.clone(), source).await;
        } else {
            debug!("Not caching rejected result for {:?} ({})", subject, source);
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use crate::cache::{config::CacheConfig, key::DEFAULT_SOURCE, store::LookupCache};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn cache() -> LookupCache<String> {
        let config = CacheConfig::builder()
            .default_ttl(Duration::from_secs(60))
            .persist(false)
            .build();
        LookupCache::new(config)
            .await
            .unwrap()
            .with_validator(|url: &String| !url.is_empty())
    }

    #[tokio::test]
    async fn test_hit_skips_lookup() {
        let cache = cache().await;
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let found = cache
                .search_with_cache(
                    |name| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async move { Ok::<_, String>(Some(format!("{}.jpg", name))) }
                    },
                    "Hades",
                    DEFAULT_SOURCE,
                )
                .await;
            assert_eq!(found, Some("Hades.jpg".to_string()));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_result_is_returned_but_not_cached() {
        let cache = cache().await;
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let found = cache
                .search_with_cache(
                    |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async { Ok::<_, String>(Some(String::new())) }
                    },
                    "Unknown Game",
                    DEFAULT_SOURCE,
                )
                .await;
            assert_eq!(found, Some(String::new()));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_absent_result_is_not_cached() {
        let cache = cache().await;

        let found = cache
            .search_with_cache(|_| async { Ok::<_, String>(None) }, "Nothing", "steam")
            .await;
        assert_eq!(found, None);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_lookup_yields_none() {
        let cache = cache().await;

        let found = cache
            .search_with_cache(
                |_| async { Err::<Option<String>, _>("upstream timed out") },
                "Flaky",
                DEFAULT_SOURCE,
            )
            .await;

        assert_eq!(found, None);
        assert_eq!(cache.get("Flaky", DEFAULT_SOURCE).await, None);
    }
}

//! # Lookup Cache
//!
//! Memoizes the results of a slow external lookup behind keys derived from a
//! `(subject, source)` pair.
//!
//! ## Features
//!
//! - **Key normalization**: case, spacing and punctuation differences in the
//!   subject collapse to one key
//! - **TTL-Based Expiration**: expired entries are never served and are purged
//!   on read or by a periodic sweep
//! - **Capacity Bound**: the oldest entry is evicted when the cache is full
//! - **Snapshots**: the whole cache is written to a JSON file and reloaded at
//!   startup, skipping entries that expired in the meantime
//! - **Write-Through Search**: [`LookupCache::search_with_cache`] runs the
//!   lookup only on a miss and caches results accepted by a validator
//!
//! ## Example
//!
//! ```rust
//! use game_image_cache::cache::{CacheConfig, LookupCache, DEFAULT_SOURCE};
//! use std::time::Duration;
//!
//! # async fn example() -> game_image_cache::Result<()> {
//! let config = CacheConfig::builder()
//!     .default_ttl(Duration::from_secs(3600))
//!     .max_size(500)
//!     .persist(false)
//!     .build();
//!
//! let cache: LookupCache<String> = LookupCache::new(config).await?;
//!
//! let cover = cache
//!     .search_with_cache(
//!         |name| async move { Ok::<_, std::io::Error>(Some(format!("https://img/{}.jpg", name))) },
//!         "Hollow Knight",
//!         DEFAULT_SOURCE,
//!     )
//!     .await;
//!
//! assert!(cover.is_some());
//! assert!(cache.contains("hollow knight", DEFAULT_SOURCE).await);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod key;
pub mod maintenance;
pub mod search;
pub mod snapshot;
pub mod store;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use entry::CacheEntry;
pub use key::{derive_key, normalize_subject, DEFAULT_SOURCE};
pub use maintenance::{spawn_cleanup, CleanupTask};
pub use search::Validator;
pub use snapshot::Snapshot;
pub use store::LookupCache;
pub use types::{CacheCounters, CacheKey, CacheStats};

//! # Game Image Cache (game-image-cache)
//!
//! Memoizing cache for game image searches. Looking up cover art across
//! several image providers is slow and sometimes fails; this crate keeps the
//! successful results keyed by normalized game name and provider so route
//! handlers only pay for the search once per title.
//!
//! ## Features
//!
//! - Case and punctuation insensitive keys (`"Baldur's Gate 3"` and
//!   `"baldurs gate 3"` share an entry)
//! - Per-entry TTL with a configurable default
//! - Oldest-first eviction at a fixed capacity
//! - JSON snapshots on disk, reloaded at startup
//! - Write-through [`search_with_cache`](cache::LookupCache::search_with_cache)
//!   that never caches failed or coverless results and never propagates lookup
//!   errors
//! - Background expiry sweep with deterministic shutdown
//!
//! ## Example
//!
//! ```no_run
//! use game_image_cache::{spawn_cleanup, CacheConfig, GameImageCache, GameImages, DEFAULT_SOURCE};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = Arc::new(GameImageCache::for_game_images(CacheConfig::from_env()?).await?);
//!     let sweeper = spawn_cleanup(Arc::clone(&cache));
//!
//!     let images = cache
//!         .search_with_cache(
//!             |name| async move {
//!                 // Query the image providers here
//!                 Ok::<_, anyhow::Error>(Some(GameImages::with_cover(format!("https://img/{}.jpg", name))))
//!             },
//!             "Stardew Valley",
//!             DEFAULT_SOURCE,
//!         )
//!         .await;
//!
//!     println!("{:?}", images);
//!     sweeper.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod images;

// Re-export main types for convenience
pub use cache::{
    derive_key, spawn_cleanup, CacheConfig, CacheConfigBuilder, CacheCounters, CacheEntry,
    CacheKey, CacheStats, CleanupTask, LookupCache, Snapshot, Validator, DEFAULT_SOURCE,
};
pub use error::{CacheError, Result};
pub use images::{GameImageCache, GameImages};

//! Configuration for the lookup cache

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the snapshot path
pub const ENV_CACHE_FILE: &str = "GAME_IMAGE_CACHE_FILE";
/// Environment variable overriding the default TTL, in milliseconds
pub const ENV_TTL_MS: &str = "GAME_IMAGE_CACHE_TTL_MS";
/// Environment variable overriding the capacity bound
pub const ENV_MAX_SIZE: &str = "GAME_IMAGE_CACHE_MAX_SIZE";
/// Environment variable overriding the snapshot batch size
pub const ENV_SNAPSHOT_BATCH: &str = "GAME_IMAGE_CACHE_SNAPSHOT_BATCH";
/// Environment variable overriding the sweep interval, in seconds
pub const ENV_CLEANUP_SECS: &str = "GAME_IMAGE_CACHE_CLEANUP_SECS";

/// Configuration for the lookup cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Snapshot file location
    pub cache_file: PathBuf,

    /// Lifetime of entries inserted without a custom TTL
    pub default_ttl: Duration,

    /// Maximum number of resident entries
    pub max_size: usize,

    /// `set` writes a snapshot whenever the entry count is a multiple of this
    pub snapshot_batch: usize,

    /// Period of the background expiry sweep
    pub cleanup_interval: Duration,

    /// Random spread applied to the default TTL (0.0 - 1.0)
    pub ttl_jitter: f64,

    /// Load and write snapshots at all
    pub persist: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_file: PathBuf::from("cache").join("image-cache.json"),
            // 24 hours
            default_ttl: Duration::from_secs(24 * 3600),
            max_size: 1_000,
            snapshot_batch: 10,
            // Sweep hourly
            cleanup_interval: Duration::from_secs(3600),
            ttl_jitter: 0.0,
            persist: true,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Settings of the application-wide game image cache: 12 hour TTL and
    /// room for 2000 titles
    pub fn game_images() -> Self {
        Self {
            default_ttl: Duration::from_secs(12 * 3600),
            max_size: 2_000,
            ..Default::default()
        }
    }

    /// Build a configuration from the process environment, reading a `.env`
    /// file first if one exists. Unset variables keep the
    /// [`game_images`](Self::game_images) values.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable source
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::game_images();

        if let Some(path) = var(ENV_CACHE_FILE) {
            config.cache_file = PathBuf::from(path);
        }
        if let Some(ms) = parse_var::<u64>(&var, ENV_TTL_MS)? {
            config.default_ttl = Duration::from_millis(ms);
        }
        if let Some(size) = parse_var::<usize>(&var, ENV_MAX_SIZE)? {
            config.max_size = size;
        }
        if let Some(batch) = parse_var::<usize>(&var, ENV_SNAPSHOT_BATCH)? {
            config.snapshot_batch = batch;
        }
        if let Some(secs) = parse_var::<u64>(&var, ENV_CLEANUP_SECS)? {
            config.cleanup_interval = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(CacheError::ConfigError(
                "max_size must be greater than 0".to_string(),
            ));
        }

        if self.snapshot_batch == 0 {
            return Err(CacheError::ConfigError(
                "snapshot_batch must be greater than 0".to_string(),
            ));
        }

        if self.default_ttl.is_zero() {
            return Err(CacheError::ConfigError(
                "default_ttl must be greater than 0".to_string(),
            ));
        }

        if self.cleanup_interval.is_zero() {
            return Err(CacheError::ConfigError(
                "cleanup_interval must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(CacheError::ConfigError(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Default TTL with jitter applied
    pub fn ttl_with_jitter(&self) -> Duration {
        if self.ttl_jitter == 0.0 {
            return self.default_ttl;
        }

        let base_ms = self.default_ttl.as_secs_f64() * 1000.0;
        let jitter_range = base_ms * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_ms = (base_ms + jitter).max(1.0);

        // Past Duration::MAX the jittered value is unrepresentable
        Duration::try_from_secs_f64(final_ms / 1000.0).unwrap_or(self.default_ttl)
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CacheError::ConfigError(format!("{}={:?}: {}", name, raw, e))),
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    cache_file: Option<PathBuf>,
    default_ttl: Option<Duration>,
    max_size: Option<usize>,
    snapshot_batch: Option<usize>,
    cleanup_interval: Option<Duration>,
    ttl_jitter: Option<f64>,
    persist: Option<bool>,
}

impl CacheConfigBuilder {
    /// Set the snapshot file path
    pub fn cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(path.into());
        self
    }

    /// Set default TTL for cache entries
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Set maximum number of cache entries
    pub fn max_size(mut self, max: usize) -> Self {
        self.max_size = Some(max);
        self
    }

    /// Set how many entries accumulate between opportunistic snapshots
    pub fn snapshot_batch(mut self, batch: usize) -> Self {
        self.snapshot_batch = Some(batch);
        self
    }

    /// Set cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = Some(interval);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Enable or disable snapshot persistence
    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = Some(persist);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            cache_file: self.cache_file.unwrap_or(defaults.cache_file),
            default_ttl: self.default_ttl.unwrap_or(defaults.default_ttl),
            max_size: self.max_size.unwrap_or(defaults.max_size),
            snapshot_batch: self.snapshot_batch.unwrap_or(defaults.snapshot_batch),
            cleanup_interval: self.cleanup_interval.unwrap_or(defaults.cleanup_interval),
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
            persist: self.persist.unwrap_or(defaults.persist),
        }
    }
}

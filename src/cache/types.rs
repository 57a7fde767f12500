//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Normalized cache key, see [`derive_key`](crate::cache::key::derive_key)
pub type CacheKey = String;

/// Running counters kept next to the entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCounters {
    /// Lookups served from the cache
    pub hits: u64,

    /// Lookups that found nothing, including expired entries
    pub misses: u64,

    /// Entries purged because they were found expired (on read or by a sweep)
    pub expired_removals: u64,

    /// Entries evicted to honor the capacity bound
    pub evictions: u64,

    /// Entries removed through `invalidate`
    pub invalidations: u64,
}

/// Point-in-time view of the cache, computed without mutating it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Resident entries, expired or not
    pub total: usize,

    /// Entries that would still be served
    pub valid: usize,

    /// Entries past expiry but not yet purged
    pub expired: usize,

    /// Mean access count over valid entries (0 when there are none)
    pub average_access: f64,

    /// Size of the resident map once serialized, in bytes
    pub memory_footprint: usize,

    /// Where snapshots are written
    pub snapshot_path: PathBuf,

    /// Counters since construction
    pub counters: CacheCounters,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.counters.hits + self.counters.misses;
        if total == 0 {
            0.0
        } else {
            (self.counters.hits as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ total: {}, valid: {}, expired: {}, avg_access: {:.2}, footprint: {} bytes, hit_rate: {:.2}%, snapshot: {} }}",
            self.total,
            self.valid,
            self.expired,
            self.average_access,
            self.memory_footprint,
            self.hit_rate(),
            self.snapshot_path.display()
        )
    }
}

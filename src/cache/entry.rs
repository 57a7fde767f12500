//! Cache entry management with TTL support

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One memoized lookup result.
///
/// Serialized with camelCase field names and epoch-millisecond timestamps,
/// which is the on-disk snapshot record format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// The lookup result
    pub data: T,

    /// Provider/category tag the entry was stored under
    pub source: String,

    /// When the entry was inserted
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// When the entry stops being served
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,

    /// Number of hits served from this entry
    #[serde(default)]
    pub access_count: u64,
}

impl<T> CacheEntry<T> {
    /// Create a new entry that expires `ttl` from now
    pub fn new(data: T, source: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self::with_expiration(data, source, now, expiry_after(now, ttl))
    }

    /// Create an entry with explicit timestamps
    pub fn with_expiration(
        data: T,
        source: impl Into<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            data,
            source: source.into(),
            created_at,
            expires_at,
            access_count: 0,
        }
    }

    /// Check expiry against a fixed instant. An entry is expired once
    /// `expires_at <= now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Record a hit
    pub fn mark_accessed(&mut self) {
        self.access_count += 1;
    }

    /// Get time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now();
        if self.is_expired_at(now) {
            None
        } else {
            (self.expires_at - now).to_std().ok()
        }
    }
}

/// `now + ttl`, saturating at the latest representable instant
pub(crate) fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

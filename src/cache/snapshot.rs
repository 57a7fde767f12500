//! File-backed snapshots of the cache contents
//!
//! A snapshot is a flat JSON object mapping cache keys to entry records. Every
//! save rewrites the whole file; there is no journal.

use crate::cache::entry::CacheEntry;
use crate::cache::types::CacheKey;
use crate::error::{CacheError, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Handle on one snapshot file
#[derive(Debug, Clone)]
pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file a save is staged in: the full file name plus `.tmp`
    pub fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Read the snapshot, keeping only entries still valid at `now`.
    ///
    /// A missing file is an empty snapshot.
    pub async fn load<T: DeserializeOwned>(
        &self,
        now: DateTime<Utc>,
    ) -> Result<HashMap<CacheKey, CacheEntry<T>>> {
        self.ensure_parent_dir().await?;

        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No snapshot at {:?}, starting empty", self.path);
                return Ok(HashMap::new());
            }
            Err(e) => return Err(CacheError::io(&self.path, e)),
        };
        let mut entries: HashMap<CacheKey, CacheEntry<T>> = serde_json::from_slice(&content)?;

        let stored = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        debug!(
            "Loaded {} of {} snapshot entries from {:?}",
            entries.len(),
            stored,
            self.path
        );

        Ok(entries)
    }

    /// Overwrite the snapshot with `entries`.
    ///
    /// Written to a sibling temp file first and renamed into place, so a
    /// crash mid-write leaves the previous snapshot intact.
    pub async fn save<T: Serialize>(&self, entries: &HashMap<CacheKey, CacheEntry<T>>) -> Result<()> {
        self.ensure_parent_dir().await?;

        let content = serde_json::to_vec(entries)?;
        let tmp = self.temp_path();
        fs::write(&tmp, &content)
            .await
            .map_err(|e| CacheError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| CacheError::io(&self.path, e))?;

        debug!("Wrote {} entries to snapshot {:?}", entries.len(), self.path);
        Ok(())
    }

    async fn ensure_parent_dir(&self) -> Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
                .await
                .map_err(|e| CacheError::io(dir, e)),
            _ => Ok(()),
        }
    }
}

//! Background expiry sweep

use crate::cache::store::LookupCache;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Handle on a running sweep task
pub struct CleanupTask<T> {
    cache: Arc<LookupCache<T>>,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Spawn a task that calls [`LookupCache::cleanup`] every
/// `cleanup_interval`, independent of reads and writes.
///
/// Must be called from within a tokio runtime.
pub fn spawn_cleanup<T>(cache: Arc<LookupCache<T>>) -> CleanupTask<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let period = cache.config.cleanup_interval;
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let sweeper = Arc::clone(&cache);

    info!("Starting automatic cache cleanup task (interval: {:?})", period);

    let handle = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = sweeper.cleanup().await;
                    if removed > 0 {
                        debug!("Auto cleanup removed {} entries", removed);
                    }
                }
                changed = shutdown_rx.changed() => {
                    // A dropped sender also ends the loop
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("Cache cleanup task stopped");
    });

    CleanupTask {
        cache,
        shutdown_tx,
        handle,
    }
}

impl<T> CleanupTask<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Whether the sweep loop has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the sweep, wait for it to exit, then write a final snapshot
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);

        if let Err(e) = self.handle.await {
            warn!("Cache cleanup task ended abnormally: {}", e);
        }

        if self.cache.flush().await {
            info!("Wrote final cache snapshot to {:?}", self.cache.snapshot_path());
        }
    }
}

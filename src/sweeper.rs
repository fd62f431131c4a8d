//! Background cache eviction
//!
//! Expiry in `CacheStore` is lazy, so keys that are never read again stay in
//! memory. A `SweepHandle` runs `purge_expired` on a fixed interval to bound
//! that growth when many distinct symbol lists are requested.

use log::{debug, info};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cache::CacheStore;

/// Shortest interval accepted; `tokio::time::interval` rejects zero
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Handle for controlling the background sweep task
///
/// Dropping the handle also stops the task.
pub struct SweepHandle {
    /// Signals the task to stop
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Spawns a task that purges expired entries from `store` every `interval`
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<V: Send + 'static>(store: CacheStore<V>, interval: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let period = interval.max(MIN_SWEEP_INTERVAL);

        info!("cache sweeper running every {:?}", period);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // Skip the first tick (immediate)
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = store.purge_expired();
                        if purged > 0 {
                            debug!("swept {} expired cache entries", purged);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }
        });

        Self { shutdown_tx, task }
    }

    /// Stops the sweep task and waits for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

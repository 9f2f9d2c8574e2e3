use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::aggregator::Aggregator;
use crate::cache::SnapshotCache;
use crate::domain::Snapshot;
use crate::error::{RankingsError, Result};

/// Runs refresh cycles one at a time and publishes successful results
pub struct Refresher {
    aggregator: Aggregator,
    cache: Arc<SnapshotCache>,
    running: AtomicBool,
}

/// Clears the running flag when a cycle ends, however it ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Refresher {
    pub fn new(aggregator: Aggregator, cache: Arc<SnapshotCache>) -> Self {
        Self {
            aggregator,
            cache,
            running: AtomicBool::new(false),
        }
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    /// Whether a cycle is in flight right now
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn try_claim(&self) -> bool {
        self.running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Run one cycle inline.
    ///
    /// Fails with [`RankingsError::RefreshInProgress`] if another cycle holds the guard.
    pub async fn refresh(&self) -> Result<Snapshot> {
        if !self.try_claim() {
            return Err(RankingsError::RefreshInProgress);
        }
        let _guard = RunningGuard(&self.running);
        self.run_claimed().await
    }

    /// Start a cycle in the background unless one is already running.
    ///
    /// Returns true if a new cycle was started.
    pub fn trigger(self: &Arc<Self>) -> bool {
        if !self.try_claim() {
            debug!("Refresh already running; not starting another");
            return false;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = RunningGuard(&this.running);
            let _ = this.run_claimed().await;
        });
        true
    }

    async fn run_claimed(&self) -> Result<Snapshot> {
        let snapshot = match self.aggregator.run_cycle().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Refresh cycle failed, keeping previous snapshot: {}", e);
                return Err(e);
            }
        };

        self.cache.publish(snapshot.clone())?;
        info!("Published snapshot with {} teams", snapshot.len());
        Ok(snapshot)
    }
}

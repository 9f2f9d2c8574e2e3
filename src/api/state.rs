use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::render::Presenter;
use crate::cache::SnapshotCache;
use crate::services::Refresher;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The live snapshot slot
    pub cache: Arc<SnapshotCache>,

    /// Background refresh trigger
    pub refresher: Arc<Refresher>,

    pub presenter: Arc<Presenter>,

    /// Set until the first request that finds no data has tried an inline refresh
    startup_fallback: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(refresher: Arc<Refresher>, presenter: Presenter) -> Self {
        Self {
            cache: Arc::clone(refresher.cache()),
            refresher,
            presenter: Arc::new(presenter),
            startup_fallback: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Disable the one-off inline refresh (the scheduler covers startup)
    pub fn without_startup_fallback(self) -> Self {
        self.startup_fallback.store(false, Ordering::SeqCst);
        self
    }

    /// Claim the one-off inline refresh; true for exactly one caller
    pub(crate) fn take_startup_fallback(&self) -> bool {
        self.startup_fallback.swap(false, Ordering::SeqCst)
    }
}

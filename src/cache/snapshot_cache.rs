use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::store::{write_json_atomic, FileStore, MemoryStore, SnapshotStore};
use crate::config::CacheConfig;
use crate::domain::Snapshot;
use crate::error::Result;

/// Key the live ranking is stored under
pub const SNAPSHOT_KEY: &str = "rankings";

/// The single live snapshot slot
pub struct SnapshotCache {
    store: Arc<dyn SnapshotStore>,
    ttl: Duration,
    refresh_threshold: f64,
    fallback_path: Option<PathBuf>,
}

impl SnapshotCache {
    pub fn new(store: Arc<dyn SnapshotStore>, ttl: Duration, refresh_threshold: f64) -> Self {
        Self {
            store,
            ttl,
            refresh_threshold,
            fallback_path: None,
        }
    }

    /// Also mirror every published snapshot to a flat JSON file
    pub fn with_fallback_file(mut self, path: PathBuf) -> Self {
        self.fallback_path = Some(path);
        self
    }

    /// Build the cache described by the config, creating the cache directory when persisting
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let cache = if config.persist {
            let store = FileStore::open(&config.dir)?;
            Self::new(Arc::new(store), config.ttl(), config.refresh_threshold)
                .with_fallback_file(config.fallback_path())
        } else {
            Self::new(Arc::new(MemoryStore::new()), config.ttl(), config.refresh_threshold)
        };
        Ok(cache)
    }

    /// Current snapshot, or `None` when nothing is cached or it has expired
    pub fn read(&self) -> Option<Snapshot> {
        self.store.get(SNAPSHOT_KEY).map(|entry| entry.snapshot)
    }

    /// Whether the snapshot is old enough that a background refresh should start
    pub fn needs_refresh(&self) -> bool {
        self.store.is_stale(SNAPSHOT_KEY, self.refresh_threshold)
    }

    /// Replace the live snapshot
    pub fn publish(&self, snapshot: Snapshot) -> Result<()> {
        if let Some(path) = &self.fallback_path {
            if let Err(e) = write_json_atomic(path, &snapshot) {
                warn!("Failed to write fallback snapshot {}: {}", path.display(), e);
            }
        }
        self.store.set_with_ttl(SNAPSHOT_KEY, snapshot, self.ttl)
    }

    /// Seed an empty store from the fallback file if that snapshot is still within its TTL.
    ///
    /// Returns true when a snapshot was restored.
    pub fn restore_fallback(&self) -> Result<bool> {
        if self.read().is_some() {
            return Ok(false);
        }
        let Some(path) = &self.fallback_path else {
            return Ok(false);
        };
        let Ok(raw) = fs::read_to_string(path) else {
            return Ok(false);
        };

        let snapshot: Snapshot = match serde_json::from_str(&raw) {
            Ok(s) => s,
            Err(e) => {
                warn!("Ignoring unreadable fallback snapshot {}: {}", path.display(), e);
                return Ok(false);
            }
        };

        let age = (Utc::now() - snapshot.last_updated).to_std().unwrap_or_default();
        let Some(remaining) = self.ttl.checked_sub(age).filter(|d| !d.is_zero()) else {
            info!("Fallback snapshot from {} is past its TTL", snapshot.last_updated);
            return Ok(false);
        };

        info!(
            "Restored {} teams from fallback snapshot ({}s left)",
            snapshot.len(),
            remaining.as_secs()
        );
        self.store.set_with_ttl(SNAPSHOT_KEY, snapshot, remaining)?;
        Ok(true)
    }
}

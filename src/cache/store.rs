//! Key → snapshot stores with a time-to-live.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::Snapshot;
use crate::error::{RankingsError, Result};

/// A snapshot plus the bookkeeping needed to expire it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub snapshot: Snapshot,
    pub stored_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StoredSnapshot {
    pub fn new(snapshot: Snapshot, stored_at: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = stored_at.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            snapshot,
            stored_at,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// True once more than `threshold` (0..=1) of the TTL has elapsed
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: f64) -> bool {
        if self.is_expired(now) {
            return true;
        }
        let ttl_ms = (self.expires_at - self.stored_at).num_milliseconds() as f64;
        let age_ms = (now - self.stored_at).num_milliseconds() as f64;
        age_ms > ttl_ms * threshold
    }
}

/// Storage seam shared by the scheduler and the request handlers
pub trait SnapshotStore: Send + Sync {
    /// Live entry for `key`; expired entries read as absent
    fn get(&self, key: &str) -> Option<StoredSnapshot>;

    fn set_with_ttl(&self, key: &str, snapshot: Snapshot, ttl: Duration) -> Result<()>;

    /// Missing and expired entries count as stale
    fn is_stale(&self, key: &str, threshold: f64) -> bool {
        self.get(key)
            .map_or(true, |entry| entry.is_stale(Utc::now(), threshold))
    }
}

/// Process-local store
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, StoredSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, key: &str) -> Option<StoredSnapshot> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(Utc::now()))
            .cloned()
    }

    fn set_with_ttl(&self, key: &str, snapshot: Snapshot, ttl: Duration) -> Result<()> {
        let entry = StoredSnapshot::new(snapshot, Utc::now(), ttl);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entry);
        Ok(())
    }
}

/// One JSON file per key in a fixed directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open the store, creating the directory if it does not exist yet
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!("Snapshot store at {}", dir.display());
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(RankingsError::Internal(format!("invalid cache key {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SnapshotStore for FileStore {
    fn get(&self, key: &str) -> Option<StoredSnapshot> {
        let path = self.path_for(key).ok()?;
        let raw = fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<StoredSnapshot>(&raw) {
            Ok(entry) if !entry.is_expired(Utc::now()) => Some(entry),
            Ok(_) => None,
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    fn set_with_ttl(&self, key: &str, snapshot: Snapshot, ttl: Duration) -> Result<()> {
        let path = self.path_for(key)?;
        let entry = StoredSnapshot::new(snapshot, Utc::now(), ttl);
        write_json_atomic(&path, &entry)
    }
}

/// Write via a temp file and rename so readers never see a partial file
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TeamRecord;

    fn snapshot() -> Snapshot {
        Snapshot::new(
            vec![TeamRecord::new(1, "Alpha", 100.0).unwrap()],
            Utc::now(),
            None,
        )
    }

    #[test]
    fn test_staleness_threshold() {
        let stored_at = Utc::now();
        let entry = StoredSnapshot::new(snapshot(), stored_at, Duration::from_secs(100));

        assert!(!entry.is_stale(stored_at + chrono::Duration::seconds(79), 0.8));
        assert!(entry.is_stale(stored_at + chrono::Duration::seconds(81), 0.8));
        assert!(!entry.is_expired(stored_at + chrono::Duration::seconds(99)));
        assert!(entry.is_expired(stored_at + chrono::Duration::seconds(100)));
    }

    #[test]
    fn test_memory_store_expiry() {
        let store = MemoryStore::new();
        store.set_with_ttl("rankings", snapshot(), Duration::from_secs(60)).unwrap();
        assert!(store.get("rankings").is_some());
        assert!(!store.is_stale("rankings", 0.8));

        store.set_with_ttl("rankings", snapshot(), Duration::ZERO).unwrap();
        assert!(store.get("rankings").is_none());
        assert!(store.is_stale("rankings", 0.8));
        assert!(store.is_stale("missing", 0.8));
    }

    #[test]
    fn test_file_store_creates_dir_and_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join(".cache");

        let store = FileStore::open(&dir).unwrap();
        assert!(dir.is_dir());

        let snap = snapshot();
        store.set_with_ttl("rankings", snap.clone(), Duration::from_secs(60)).unwrap();

        // A second handle on the same directory sees the entry
        let reopened = FileStore::open(&dir).unwrap();
        let entry = reopened.get("rankings").unwrap();
        assert_eq!(entry.snapshot, snap);
        assert!(!dir.join("rankings.json.tmp").exists());
    }

    #[test]
    fn test_file_store_ignores_corrupt_and_expired_entries() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();

        fs::write(tmp.path().join("rankings.json"), "{not json").unwrap();
        assert!(store.get("rankings").is_none());

        store.set_with_ttl("rankings", snapshot(), Duration::ZERO).unwrap();
        assert!(store.get("rankings").is_none());
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();
        assert!(store
            .set_with_ttl("../escape", snapshot(), Duration::from_secs(1))
            .is_err());
    }
}

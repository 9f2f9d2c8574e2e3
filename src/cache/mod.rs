//! Snapshot caching: an injectable TTL store and the single live slot on top of it.

pub mod snapshot_cache;
pub mod store;

pub use snapshot_cache::{SnapshotCache, SNAPSHOT_KEY};
pub use store::{FileStore, MemoryStore, SnapshotStore, StoredSnapshot};

// ── Storage ──
//
// Committed in-memory tables plus the durable snapshot/preferences store.

mod kv;
mod snapshot;
mod tables;

pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use snapshot::{PREFERENCES_KEY, SNAPSHOT_KEY, Snapshot, SnapshotStore};
pub use tables::{DataStore, FleetTables, TableSource};

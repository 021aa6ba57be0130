pub mod roster_store;
pub mod snapshot_store;

pub use roster_store::{MemoryRoster, RosterStore};
pub use snapshot_store::{JsonFileSnapshotStore, MemorySnapshotStore, SnapshotStore};

// Storage module - PERSISTENCE
// Distribution snapshots, config and stage checkpoints in sled

mod store;

pub use store::{LedgerStore, StorageStats, StoreError};

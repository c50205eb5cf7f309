// LedgerStore - Persistent distribution state using sled
//
// Holds:
// - The current distribution snapshot and its SHA-256 digest
// - The event log, one key per event
// - The distribution config as JSON
// - One checkpoint snapshot per entered stage

use crate::distribution::{Clock, DistributionConfig, Distribution, EventRecord, Stage};
use crate::identity::Address;
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;

/// Fixed keys and key prefixes
mod keys {
    pub const SNAPSHOT: &[u8] = b"ledger:snapshot";
    pub const DIGEST: &[u8] = b"ledger:digest";
    pub const CONFIG: &[u8] = b"config:distribution";
    pub const CHECKPOINT_PREFIX: &[u8] = b"checkpoint:";
    /// Followed by the big-endian sequence number, so keys sort in log order
    pub const EVENT_PREFIX: &[u8] = b"event:";
}

/// Errors from the ledger store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database: {0}")]
    OpenFailed(String),

    #[error("Database operation failed: {0}")]
    DatabaseError(String),

    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Stored snapshot does not match its digest")]
    DigestMismatch,

    #[error("Flush failed: {0}")]
    FlushFailed(String),
}

impl From<sled::Error> for StoreError {
    fn from(err: sled::Error) -> Self {
        StoreError::DatabaseError(err.to_string())
    }
}

/// Size of the store
#[derive(Clone, Debug)]
pub struct StorageStats {
    /// Snapshot, digest, config, checkpoint and event entries
    pub key_count: usize,
    /// As reported by sled
    pub disk_size_bytes: u64,
}

/// Persistent store for one distribution
///
/// A snapshot, its digest and the events recorded since the previous save
/// are written in one batch; call `flush` before the process exits.
pub struct LedgerStore {
    db: sled::Db,
}

impl LedgerStore {
    /// Open the sled database at `path`, creating it if missing
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(|e| StoreError::OpenFailed(e.to_string()))?;
        Ok(Self { db })
    }

    /// True before the first `init`
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.db.is_empty())
    }

    /// Wait until every write is on disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map_err(|e| StoreError::FlushFailed(e.to_string()))?;
        Ok(())
    }

    pub fn stats(&self) -> Result<StorageStats, StoreError> {
        Ok(StorageStats {
            key_count: self.db.len(),
            disk_size_bytes: self.db.size_on_disk().unwrap_or(0),
        })
    }

    // ========================================================================
    // RAW ACCESS
    // ========================================================================

    pub fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.db.insert(key, value)?;
        Ok(())
    }

    pub fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    /// Keys starting with `prefix`, in byte order
    pub fn list_keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, StoreError> {
        let mut keys = Vec::new();
        for result in self.db.scan_prefix(prefix) {
            let (key, _) = result?;
            keys.push(key.to_vec());
        }
        Ok(keys)
    }

    /// Drop every entry, used when a distribution is re-initialised
    pub fn clear(&self) -> Result<(), StoreError> {
        self.db.clear()?;
        Ok(())
    }

    // ========================================================================
    // DISTRIBUTION SNAPSHOT
    // ========================================================================

    /// Whether a distribution has been saved
    pub fn has_distribution(&self) -> Result<bool, StoreError> {
        Ok(self.db.contains_key(keys::SNAPSHOT)?)
    }

    /// Save the distribution state together with its digest
    ///
    /// Events still held by the distribution go to the event log in the same
    /// batch and are then taken out of it, so the snapshot stays bounded by
    /// the ledger size rather than by its age.
    pub fn save_distribution(&self, distribution: &mut Distribution) -> Result<[u8; 32], StoreError> {
        let mut snapshot = distribution.snapshot();
        let events = std::mem::take(&mut snapshot.history);
        let bytes = snapshot
            .to_bytes()
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;
        let digest: [u8; 32] = Sha256::digest(&bytes).into();

        let mut batch = sled::Batch::default();
        for record in &events {
            let value = postcard::to_allocvec(record)
                .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;
            batch.insert(event_key(record.sequence), value);
        }
        batch.insert(keys::SNAPSHOT, bytes);
        batch.insert(keys::DIGEST, digest.to_vec());
        self.db.apply_batch(batch)?;

        distribution.take_history();
        Ok(digest)
    }

    /// Load the distribution state, verifying its digest
    pub fn load_distribution(
        &self,
        clock: impl Clock + 'static,
    ) -> Result<Option<Distribution>, StoreError> {
        let Some(bytes) = self.get_raw(keys::SNAPSHOT)? else {
            return Ok(None);
        };

        if let Some(stored) = self.get_raw(keys::DIGEST)? {
            if Sha256::digest(&bytes).as_slice() != stored.as_slice() {
                return Err(StoreError::DigestMismatch);
            }
        }

        let distribution = Distribution::from_bytes(&bytes, clock)
            .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
        Ok(Some(distribution))
    }

    /// Digest recorded with the last save
    pub fn stored_digest(&self) -> Result<Option<Vec<u8>>, StoreError> {
        self.get_raw(keys::DIGEST)
    }

    // ========================================================================
    // EVENT LOG
    // ========================================================================

    /// Every persisted event, oldest first
    pub fn events(&self) -> Result<Vec<EventRecord>, StoreError> {
        let mut events = Vec::new();
        for result in self.db.scan_prefix(keys::EVENT_PREFIX) {
            let (_, value) = result?;
            let record: EventRecord = postcard::from_bytes(&value)
                .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
            events.push(record);
        }
        Ok(events)
    }

    /// Persisted events touching one account, oldest first
    pub fn events_for(&self, account: &Address) -> Result<Vec<EventRecord>, StoreError> {
        Ok(self
            .events()?
            .into_iter()
            .filter(|record| record.event.involves(account))
            .collect())
    }

    // ========================================================================
    // CONFIGURATION
    // ========================================================================

    /// Save the config as JSON
    pub fn save_config(&self, config: &DistributionConfig) -> Result<(), StoreError> {
        let json = config
            .to_json()
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;
        self.put_raw(keys::CONFIG, json.as_bytes())
    }

    /// Load the config saved with `save_config`
    pub fn load_config(&self) -> Result<Option<DistributionConfig>, StoreError> {
        match self.get_raw(keys::CONFIG)? {
            Some(bytes) => {
                let json = String::from_utf8(bytes)
                    .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
                let config = DistributionConfig::from_json(&json)
                    .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }

    // ========================================================================
    // STAGE CHECKPOINTS
    // ========================================================================

    /// Keep a copy of the state as it was when `stage` was entered
    pub fn save_checkpoint(&self, stage: Stage, distribution: &Distribution) -> Result<(), StoreError> {
        let bytes = distribution
            .to_bytes()
            .map_err(|e| StoreError::SerializationFailed(e.to_string()))?;
        self.put_raw(&checkpoint_key(stage), &bytes)
    }

    pub fn load_checkpoint(
        &self,
        stage: Stage,
        clock: impl Clock + 'static,
    ) -> Result<Option<Distribution>, StoreError> {
        match self.get_raw(&checkpoint_key(stage))? {
            Some(bytes) => {
                let distribution = Distribution::from_bytes(&bytes, clock)
                    .map_err(|e| StoreError::DeserializationFailed(e.to_string()))?;
                Ok(Some(distribution))
            }
            None => Ok(None),
        }
    }

    /// Stages with a saved checkpoint, in lifecycle order
    pub fn checkpoints(&self) -> Result<Vec<Stage>, StoreError> {
        let mut stages: Vec<Stage> = self
            .list_keys_with_prefix(keys::CHECKPOINT_PREFIX)?
            .iter()
            .filter_map(|key| {
                let name = std::str::from_utf8(&key[keys::CHECKPOINT_PREFIX.len()..]).ok()?;
                name.parse().ok()
            })
            .collect();
        stages.sort();
        Ok(stages)
    }
}

fn checkpoint_key(stage: Stage) -> Vec<u8> {
    [keys::CHECKPOINT_PREFIX, stage.name().as_bytes()].concat()
}

fn event_key(sequence: u64) -> Vec<u8> {
    [keys::EVENT_PREFIX, &sequence.to_be_bytes()[..]].concat()
}

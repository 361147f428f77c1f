//! # In-Memory Versioned Ledger
//!
//! Reference [`VersionedStore`] adapter. Keeps every version of every key
//! and serializes writers per key through a compare-and-swap on the version
//! observed at `begin`. A production deployment substitutes a distributed
//! ledger client behind the same trait.

use crate::ports::store::{
    CommitReceipt, HistoryEntry, LedgerTx, StoreError, VersionedStore, VersionedValue,
};
use crate::ports::time::TimeSource;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;
use uuid::Uuid;

struct StoredVersion {
    tx_id: String,
    commit_time: u64,
    bytes: Vec<u8>,
}

/// In-memory ledger with per-key version history.
pub struct InMemoryLedger {
    data: RwLock<HashMap<String, Vec<StoredVersion>>>,
    time: Arc<dyn TimeSource>,
}

impl InMemoryLedger {
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            time,
        }
    }

    fn lock_poisoned() -> StoreError {
        StoreError::Backend("ledger lock poisoned".to_string())
    }
}

impl VersionedStore for InMemoryLedger {
    fn begin(&self, key: &str) -> Result<(LedgerTx, Option<VersionedValue>), StoreError> {
        let current = self.current(key)?;
        let tx = LedgerTx {
            key: key.to_string(),
            tx_id: Uuid::new_v4().to_string(),
            tx_time: self.time.now(),
            read_version: current.as_ref().map(|v| v.version),
        };
        Ok((tx, current))
    }

    fn current(&self, key: &str) -> Result<Option<VersionedValue>, StoreError> {
        let data = self.data.read().map_err(|_| Self::lock_poisoned())?;
        let Some(versions) = data.get(key) else {
            return Ok(None);
        };
        Ok(versions.last().map(|v| VersionedValue {
            version: versions.len() as u64,
            tx_id: v.tx_id.clone(),
            commit_time: v.commit_time,
            bytes: v.bytes.clone(),
        }))
    }

    fn commit(&self, tx: &LedgerTx, bytes: Vec<u8>) -> Result<CommitReceipt, StoreError> {
        let mut data = self.data.write().map_err(|_| Self::lock_poisoned())?;
        let versions = data.entry(tx.key.clone()).or_default();

        let live_version = if versions.is_empty() {
            None
        } else {
            Some(versions.len() as u64)
        };
        if live_version != tx.read_version {
            return Err(StoreError::Conflict {
                key: tx.key.clone(),
                read_version: tx.read_version,
            });
        }

        versions.push(StoredVersion {
            tx_id: tx.tx_id.clone(),
            commit_time: tx.tx_time,
            bytes,
        });
        let version = versions.len() as u64;

        debug!(key = %tx.key, version, tx_id = %tx.tx_id, "Version committed");

        Ok(CommitReceipt {
            tx_id: tx.tx_id.clone(),
            version,
            commit_time: tx.tx_time,
        })
    }

    fn history_of(&self, key: &str) -> Result<Vec<HistoryEntry>, StoreError> {
        let data = self.data.read().map_err(|_| Self::lock_poisoned())?;
        let Some(versions) = data.get(key) else {
            return Ok(Vec::new());
        };
        Ok(versions
            .iter()
            .map(|v| HistoryEntry {
                tx_id: v.tx_id.clone(),
                commit_time: v.commit_time,
                is_delete: false,
                bytes: Some(v.bytes.clone()),
            })
            .collect())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let data = self.data.read().map_err(|_| Self::lock_poisoned())?;
        let mut keys: Vec<String> = data.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

//! # Versioned Store Port
//!
//! Abstraction over the replicated ledger: a key-value store where every
//! write appends a new version and the full per-key history is retained.
//! Isolates the workflow logic from any specific replication substrate;
//! the bundled adapter is in-memory, a production deployment would sit a
//! distributed ledger client behind the same trait.

use shared_types::entities::Timestamp;
use thiserror::Error;

/// Errors from the ledger substrate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A concurrent writer committed a newer version first. The whole
    /// transaction is aborted; nothing was written.
    #[error("commit conflict on key {key}: read version {read_version:?} is stale")]
    Conflict {
        key: String,
        read_version: Option<u64>,
    },

    /// The backing store failed.
    #[error("ledger backend error: {0}")]
    Backend(String),
}

/// The latest committed value for a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedValue {
    /// Monotonic per-key version, starting at 1.
    pub version: u64,
    /// Id of the transaction that committed this version.
    pub tx_id: String,
    /// Commit time assigned by the ledger.
    pub commit_time: Timestamp,
    /// Serialized record bytes.
    pub bytes: Vec<u8>,
}

/// An open transaction against one key.
///
/// Captures the version observed at begin time; commit succeeds only if no
/// other writer has committed since.
#[derive(Clone, Debug)]
pub struct LedgerTx {
    pub key: String,
    /// Transaction id, minted at begin time.
    pub tx_id: String,
    /// Transaction timestamp, fixed at begin time. This is the only time
    /// value workflow operations may use.
    pub tx_time: Timestamp,
    /// Version observed at begin; `None` if the key did not exist.
    pub read_version: Option<u64>,
}

/// Receipt for a successful commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReceipt {
    pub tx_id: String,
    /// Version assigned to the committed value.
    pub version: u64,
    /// Commit time recorded in the history.
    pub commit_time: Timestamp,
}

/// One historical version of a key, oldest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub tx_id: String,
    pub commit_time: Timestamp,
    /// Whether this entry recorded a deletion. Archive records are never
    /// deleted; the field exists for parity with substrates that can.
    pub is_delete: bool,
    /// Serialized record bytes; `None` for deletions.
    pub bytes: Option<Vec<u8>>,
}

/// Versioned key-value ledger with optimistic concurrency and history.
pub trait VersionedStore: Send + Sync {
    /// Open a transaction: snapshot the latest value (if any) and mint the
    /// transaction id and timestamp.
    fn begin(&self, key: &str) -> Result<(LedgerTx, Option<VersionedValue>), StoreError>;

    /// Read the latest committed value without opening a transaction.
    fn current(&self, key: &str) -> Result<Option<VersionedValue>, StoreError>;

    /// Commit a new version. Fails with [`StoreError::Conflict`] if the
    /// key's version no longer matches the one observed at `begin`.
    fn commit(&self, tx: &LedgerTx, bytes: Vec<u8>) -> Result<CommitReceipt, StoreError>;

    /// Full version history of a key, oldest first. Empty if unknown.
    fn history_of(&self, key: &str) -> Result<Vec<HistoryEntry>, StoreError>;

    /// All keys ever written, sorted.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

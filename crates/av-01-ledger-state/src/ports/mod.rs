//! Outbound ports: the versioned store and the time source.

pub mod store;
pub mod time;

pub use store::{
    CommitReceipt, HistoryEntry, LedgerTx, StoreError, VersionedStore, VersionedValue,
};
pub use time::TimeSource;

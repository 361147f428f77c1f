//! # Consistency Cache
//!
//! A denormalized local mirror of archive metadata, answering the
//! "list every archive visible to this caller" queries the ledger's
//! key-value layout is poor at.
//!
//! The cache is never authoritative. Every list read re-verifies each row
//! against the ledger's current value and refreshes the row on success.
//! When the ledger cannot be reached for a row, the last-known value is
//! served unchanged and the whole listing is marked degraded.
//!
//! ## Reconciliation
//!
//! Rows carry the ledger version they mirror, and an upsert only lands if
//! the incoming version is equal or newer. Two reconciliations racing over
//! the same row therefore converge on the newest version regardless of
//! ordering, and running reconciliation redundantly is harmless.

use av_01_ledger_state::{StoreError, VersionedStore};
use shared_types::entities::ArchiveRecord;
use shared_types::errors::WorkflowError;
use shared_types::roles::{CallerClaims, Role};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

#[derive(Clone)]
struct CachedRow {
    /// Ledger version this row mirrors
    version: u64,
    record: ArchiveRecord,
}

/// Result of a list query.
#[derive(Clone, Debug)]
pub struct Listing {
    /// Visible records, newest registration first
    pub records: Vec<ArchiveRecord>,
    /// True when at least one row could not be re-verified against the
    /// ledger and was served from the last-known cache value
    pub degraded: bool,
}

/// Counters for observing cache behavior.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub rows: usize,
    pub refreshed: u64,
    pub stale_served: u64,
}

/// Ledger-shadowing read mirror.
pub struct ConsistencyCache {
    store: Arc<dyn VersionedStore>,
    rows: RwLock<HashMap<String, CachedRow>>,
    refreshed: AtomicU64,
    stale_served: AtomicU64,
}

impl ConsistencyCache {
    pub fn new(store: Arc<dyn VersionedStore>) -> Self {
        Self {
            store,
            rows: RwLock::new(HashMap::new()),
            refreshed: AtomicU64::new(0),
            stale_served: AtomicU64::new(0),
        }
    }

    /// Mirror a record at a known ledger version.
    ///
    /// Idempotent: an older version never overwrites a newer row, so this
    /// is safe to call redundantly from concurrent reconciliations.
    pub fn upsert(
        &self,
        archive_id: &str,
        version: u64,
        record: ArchiveRecord,
    ) -> Result<(), WorkflowError> {
        let mut rows = self.rows.write().map_err(|_| lock_poisoned())?;
        match rows.get(archive_id) {
            Some(existing) if existing.version > version => {
                debug!(
                    archive_id,
                    cached = existing.version,
                    incoming = version,
                    "Stale upsert ignored"
                );
            }
            _ => {
                rows.insert(archive_id.to_string(), CachedRow { version, record });
            }
        }
        Ok(())
    }

    /// Pull one archive's current ledger value into the cache.
    pub fn reconcile(&self, archive_id: &str) -> Result<(), WorkflowError> {
        if let Some(current) = self.store.current(archive_id).map_err(map_store_err)? {
            let record = decode(&current.bytes)?;
            self.upsert(archive_id, current.version, record)?;
        }
        Ok(())
    }

    /// Mirror every key the ledger currently holds. Used at startup to warm
    /// the cache; list reads keep it fresh afterwards.
    pub fn warm(&self) -> Result<usize, WorkflowError> {
        let keys = self.store.keys().map_err(map_store_err)?;
        for key in &keys {
            self.reconcile(key)?;
        }
        debug!(rows = keys.len(), "Cache warmed from ledger");
        Ok(keys.len())
    }

    /// List every archive visible to the caller, newest registration first.
    ///
    /// Each visible row is re-verified against the ledger before being
    /// returned; rows the ledger cannot answer for are served from cache
    /// and flagged via [`Listing::degraded`].
    ///
    /// Visibility: Uploaders see only records they own; every other role
    /// sees all rows.
    pub fn list(&self, claims: &CallerClaims) -> Result<Listing, WorkflowError> {
        let snapshot: Vec<(String, CachedRow)> = {
            let rows = self.rows.read().map_err(|_| lock_poisoned())?;
            rows.iter()
                .filter(|(_, row)| visible_to(claims, &row.record))
                .map(|(id, row)| (id.clone(), row.clone()))
                .collect()
        };

        let mut records = Vec::with_capacity(snapshot.len());
        let mut degraded = false;

        for (archive_id, cached) in snapshot {
            match self.store.current(&archive_id) {
                Ok(Some(current)) => {
                    let record = decode(&current.bytes)?;
                    self.upsert(&archive_id, current.version, record.clone())?;
                    self.refreshed.fetch_add(1, Ordering::Relaxed);
                    // Re-check visibility: ownership may have been corrected
                    // by a fresher version.
                    if visible_to(claims, &record) {
                        records.push(record);
                    }
                }
                // Records are never deleted; a missing key means the mirror
                // is ahead of this ledger view. Serve the cached row.
                Ok(None) => {
                    self.stale_served.fetch_add(1, Ordering::Relaxed);
                    degraded = true;
                    records.push(cached.record);
                }
                Err(err) => {
                    warn!(archive_id, error = %err, "Ledger unavailable, serving cached row");
                    self.stale_served.fetch_add(1, Ordering::Relaxed);
                    degraded = true;
                    records.push(cached.record);
                }
            }
        }

        records.sort_by(|a, b| {
            b.registered_at
                .cmp(&a.registered_at)
                .then_with(|| a.archive_id.cmp(&b.archive_id))
        });

        Ok(Listing { records, degraded })
    }

    pub fn stats(&self) -> Result<CacheStats, WorkflowError> {
        let rows = self.rows.read().map_err(|_| lock_poisoned())?;
        Ok(CacheStats {
            rows: rows.len(),
            refreshed: self.refreshed.load(Ordering::Relaxed),
            stale_served: self.stale_served.load(Ordering::Relaxed),
        })
    }
}

fn visible_to(claims: &CallerClaims, record: &ArchiveRecord) -> bool {
    match claims.role {
        Role::Uploader => record.owner == claims.username,
        _ => true,
    }
}

fn decode(bytes: &[u8]) -> Result<ArchiveRecord, WorkflowError> {
    serde_json::from_slice(bytes).map_err(|e| WorkflowError::Serialization(e.to_string()))
}

fn lock_poisoned() -> WorkflowError {
    WorkflowError::Storage("cache lock poisoned".to_string())
}

fn map_store_err(err: StoreError) -> WorkflowError {
    match err {
        StoreError::Conflict { key, .. } => WorkflowError::CommitConflict { key },
        StoreError::Backend(msg) => WorkflowError::Storage(msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use av_01_ledger_state::{
        CommitReceipt, FixedTimeSource, HistoryEntry, InMemoryLedger, LedgerStateMachine,
        LedgerTx, RegisterRequest, VersionedValue,
    };
    use shared_types::entities::ArchiveStatus;
    use std::sync::atomic::AtomicBool;

    fn register_req(id: &str, owner: &str, at: u64) -> RegisterRequest {
        RegisterRequest {
            archive_id: id.into(),
            cipher_hash: "hash".into(),
            blob_locator: "loc".into(),
            owner: owner.into(),
            classification: "internal".into(),
            status: ArchiveStatus::Draft,
            timestamp: at,
            uploader_name: None,
            uploader_type: None,
        }
    }

    fn build() -> (LedgerStateMachine, ConsistencyCache) {
        let store = Arc::new(InMemoryLedger::new(Arc::new(FixedTimeSource::new(1_000))));
        (
            LedgerStateMachine::new(store.clone()),
            ConsistencyCache::new(store),
        )
    }

    /// Store wrapper that can be switched into a failing state.
    struct FlakyStore {
        inner: InMemoryLedger,
        failing: AtomicBool,
    }

    impl FlakyStore {
        fn check(&self) -> Result<(), StoreError> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StoreError::Backend("ledger unreachable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl VersionedStore for FlakyStore {
        fn begin(&self, key: &str) -> Result<(LedgerTx, Option<VersionedValue>), StoreError> {
            self.check()?;
            self.inner.begin(key)
        }
        fn current(&self, key: &str) -> Result<Option<VersionedValue>, StoreError> {
            self.check()?;
            self.inner.current(key)
        }
        fn commit(&self, tx: &LedgerTx, bytes: Vec<u8>) -> Result<CommitReceipt, StoreError> {
            self.check()?;
            self.inner.commit(tx, bytes)
        }
        fn history_of(&self, key: &str) -> Result<Vec<HistoryEntry>, StoreError> {
            self.check()?;
            self.inner.history_of(key)
        }
        fn keys(&self) -> Result<Vec<String>, StoreError> {
            self.check()?;
            self.inner.keys()
        }
    }

    #[test]
    fn test_list_reflects_fresh_ledger_state() {
        let (machine, cache) = build();
        let uploader = CallerClaims::new("sari", Role::Uploader);

        machine.register(&uploader, register_req("a1", "sari", 100)).unwrap();
        cache.reconcile("a1").unwrap();

        // Mutate behind the cache's back, then list: the row is refreshed.
        machine.submit(&uploader, "a1").unwrap();
        let listing = cache.list(&uploader).unwrap();

        assert!(!listing.degraded);
        assert_eq!(listing.records.len(), 1);
        assert_eq!(listing.records[0].status, ArchiveStatus::Pending);
    }

    #[test]
    fn test_uploader_sees_only_own_rows() {
        let (machine, cache) = build();
        let sari = CallerClaims::new("sari", Role::Uploader);
        let tono = CallerClaims::new("tono", Role::Uploader);

        machine.register(&sari, register_req("a1", "sari", 100)).unwrap();
        machine.register(&tono, register_req("a2", "tono", 200)).unwrap();
        cache.warm().unwrap();

        let listing = cache.list(&sari).unwrap();
        assert_eq!(listing.records.len(), 1);
        assert_eq!(listing.records[0].archive_id, "a1");

        let approver = CallerClaims::new("rani", Role::Approver);
        assert_eq!(cache.list(&approver).unwrap().records.len(), 2);
    }

    #[test]
    fn test_listing_sorted_newest_registration_first() {
        let (machine, cache) = build();
        let admin = CallerClaims::new("root", Role::Admin);

        machine.register(&admin, register_req("old", "sari", 100)).unwrap();
        machine.register(&admin, register_req("new", "sari", 300)).unwrap();
        machine.register(&admin, register_req("mid", "sari", 200)).unwrap();
        cache.warm().unwrap();

        let ids: Vec<String> = cache
            .list(&admin)
            .unwrap()
            .records
            .into_iter()
            .map(|r| r.archive_id)
            .collect();
        assert_eq!(ids, ["new", "mid", "old"]);
    }

    #[test]
    fn test_unreachable_ledger_serves_stale_rows_degraded() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryLedger::new(Arc::new(FixedTimeSource::new(1_000))),
            failing: AtomicBool::new(false),
        });
        let machine = LedgerStateMachine::new(store.clone());
        let cache = ConsistencyCache::new(store.clone());

        let admin = CallerClaims::new("root", Role::Admin);
        machine.register(&admin, register_req("a1", "sari", 100)).unwrap();
        cache.warm().unwrap();

        store.failing.store(true, Ordering::SeqCst);
        let listing = cache.list(&admin).unwrap();

        assert!(listing.degraded);
        assert_eq!(listing.records.len(), 1);
        assert_eq!(listing.records[0].status, ArchiveStatus::Draft);
        assert_eq!(cache.stats().unwrap().stale_served, 1);
    }

    #[test]
    fn test_upsert_is_version_guarded() {
        let (machine, cache) = build();
        let uploader = CallerClaims::new("sari", Role::Uploader);

        let (draft, _) = machine.register(&uploader, register_req("a1", "sari", 100)).unwrap();
        let (pending, _) = machine.submit(&uploader, "a1").unwrap();

        cache.upsert("a1", 2, pending).unwrap();
        // A late replay of version 1 must not roll the row back.
        cache.upsert("a1", 1, draft).unwrap();

        let listing = cache.list(&uploader).unwrap();
        assert_eq!(listing.records[0].status, ArchiveStatus::Pending);
    }

    #[test]
    fn test_empty_cache_lists_empty() {
        let (_, cache) = build();
        let admin = CallerClaims::new("root", Role::Admin);
        let listing = cache.list(&admin).unwrap();
        assert!(listing.records.is_empty());
        assert!(!listing.degraded);
    }
}

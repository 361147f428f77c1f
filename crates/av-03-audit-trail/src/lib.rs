//! # Audit Trail Reader
//!
//! Replays the immutable per-key version history the ledger keeps for each
//! archive. Pure reader: no side effects, safe to call repeatedly, and each
//! call re-opens the history from the first version.
//!
//! Access is gated to Admin, Approver, and Auditor. Uploaders and Borrowers
//! cannot read history, not even for their own records — the trail exposes
//! every intermediate state, including rejection notes and other borrowers'
//! loan details.

use av_01_ledger_state::{authorize, StoreError, VersionedStore};
use serde::Serialize;
use shared_types::entities::{ArchiveRecord, Timestamp};
use shared_types::errors::WorkflowError;
use shared_types::roles::{CallerClaims, Role};
use std::sync::Arc;
use tracing::debug;

/// Roles permitted to read audit history.
const AUDIT_ROLES: [Role; 3] = [Role::Admin, Role::Approver, Role::Auditor];

/// One historical version of an archive record.
#[derive(Clone, Debug, Serialize)]
pub struct AuditEntry {
    /// Ledger transaction that committed this version
    pub tx_id: String,
    /// Commit timestamp (epoch ms)
    pub commit_time: Timestamp,
    /// Whether this version deleted the key
    pub is_delete: bool,
    /// The record as of this version; `None` for deletions
    pub snapshot: Option<ArchiveRecord>,
}

/// Ordered, restartable history reader for archive keys.
pub struct AuditTrailReader {
    store: Arc<dyn VersionedStore>,
}

impl AuditTrailReader {
    pub fn new(store: Arc<dyn VersionedStore>) -> Self {
        Self { store }
    }

    /// Read the full history of one archive, oldest first.
    ///
    /// An unknown id yields `NotFound` rather than an empty trail, so a
    /// caller cannot mistake a typo for a record with no history.
    ///
    /// # Errors
    ///
    /// `RoleNotPermitted` for callers outside [`AUDIT_ROLES`]; `NotFound`
    /// for an id with no versions; `Serialization` if a stored snapshot
    /// cannot be decoded.
    pub fn history(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
    ) -> Result<Vec<AuditEntry>, WorkflowError> {
        authorize::require_role(claims, &AUDIT_ROLES, "read audit history")?;

        let raw = self.store.history_of(archive_id).map_err(map_store_err)?;
        if raw.is_empty() {
            return Err(WorkflowError::NotFound {
                archive_id: archive_id.to_string(),
            });
        }

        let mut entries = Vec::with_capacity(raw.len());
        for version in raw {
            let snapshot = match (&version.bytes, version.is_delete) {
                (Some(bytes), false) => Some(
                    serde_json::from_slice(bytes)
                        .map_err(|e| WorkflowError::Serialization(e.to_string()))?,
                ),
                _ => None,
            };
            entries.push(AuditEntry {
                tx_id: version.tx_id,
                commit_time: version.commit_time,
                is_delete: version.is_delete,
                snapshot,
            });
        }

        debug!(archive_id, versions = entries.len(), "Audit history read");
        Ok(entries)
    }
}

fn map_store_err(err: StoreError) -> WorkflowError {
    match err {
        StoreError::Conflict { key, .. } => WorkflowError::CommitConflict { key },
        StoreError::Backend(msg) => WorkflowError::Storage(msg),
    }
}

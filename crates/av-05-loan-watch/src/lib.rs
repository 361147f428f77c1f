//! # Loan Due Watch
//!
//! Periodic scanner over the ledger's current state: every loan still out
//! at or past its due date produces one overdue notification per contact
//! channel the borrower supplied. A persisted marker per
//! `(archive id, channel)` guarantees a pair never notifies twice, even
//! across process restarts or overlapping scans.
//!
//! The watch produces notification *records*; actual delivery (mail, SMS)
//! belongs to external collaborators consuming them.

use av_01_ledger_state::{StoreError, VersionedStore};
use serde::{Deserialize, Serialize};
use shared_types::entities::{ArchiveRecord, Timestamp};
use shared_types::errors::WorkflowError;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Contact channel an overdue notice goes out on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Phone,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

/// One overdue notice ready for an external dispatcher.
#[derive(Clone, Debug, Serialize)]
pub struct OverdueNotification {
    pub archive_id: String,
    pub channel: NotificationChannel,
    /// Address or number to dispatch to
    pub contact: String,
    pub borrower: String,
    pub borrower_name: String,
    pub due_date: Timestamp,
}

/// Outcome of one scan pass.
#[derive(Debug, Default)]
pub struct ScanReport {
    /// Archives examined
    pub checked: usize,
    /// Fresh notifications produced this pass
    pub notifications: Vec<OverdueNotification>,
}

/// Persisted dedup markers. One marker per (archive id, channel), written
/// when the notification is produced and never removed.
pub trait NotificationMarkerStore: Send + Sync {
    /// Record that the pair has been notified. Returns `false` if a marker
    /// already existed (the notification must then be suppressed).
    fn mark(&self, archive_id: &str, channel: NotificationChannel) -> Result<bool, WorkflowError>;

    /// Whether the pair has already been notified.
    fn is_marked(
        &self,
        archive_id: &str,
        channel: NotificationChannel,
    ) -> Result<bool, WorkflowError>;
}

/// In-memory reference marker store.
#[derive(Default)]
pub struct InMemoryMarkerStore {
    markers: RwLock<HashSet<(String, NotificationChannel)>>,
}

impl InMemoryMarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> WorkflowError {
        WorkflowError::Storage("marker store lock poisoned".to_string())
    }
}

impl NotificationMarkerStore for InMemoryMarkerStore {
    fn mark(&self, archive_id: &str, channel: NotificationChannel) -> Result<bool, WorkflowError> {
        let mut markers = self.markers.write().map_err(|_| Self::lock_poisoned())?;
        Ok(markers.insert((archive_id.to_string(), channel)))
    }

    fn is_marked(
        &self,
        archive_id: &str,
        channel: NotificationChannel,
    ) -> Result<bool, WorkflowError> {
        let markers = self.markers.read().map_err(|_| Self::lock_poisoned())?;
        Ok(markers.contains(&(archive_id.to_string(), channel)))
    }
}

/// The scanner itself.
pub struct LoanWatch {
    store: Arc<dyn VersionedStore>,
    markers: Arc<dyn NotificationMarkerStore>,
}

impl LoanWatch {
    pub fn new(store: Arc<dyn VersionedStore>, markers: Arc<dyn NotificationMarkerStore>) -> Self {
        Self { store, markers }
    }

    /// One scan pass over every archive the ledger knows.
    ///
    /// Safe to run redundantly: the marker store's insert-once semantics
    /// make overlapping scans produce each notification exactly once.
    pub fn scan(&self, now: Timestamp) -> Result<ScanReport, WorkflowError> {
        let keys = self.store.keys().map_err(map_store_err)?;
        let mut report = ScanReport {
            checked: keys.len(),
            notifications: Vec::new(),
        };

        for archive_id in keys {
            let Some(current) = self.store.current(&archive_id).map_err(map_store_err)? else {
                continue;
            };
            let record: ArchiveRecord = serde_json::from_slice(&current.bytes)
                .map_err(|e| WorkflowError::Serialization(e.to_string()))?;

            let Some(loan) = record.active_loan() else {
                continue;
            };
            if !loan.is_overdue(now) {
                continue;
            }

            for (channel, contact) in [
                (NotificationChannel::Email, &loan.borrower_email),
                (NotificationChannel::Phone, &loan.borrower_phone),
            ] {
                if contact.is_empty() {
                    continue;
                }
                // mark() is the dedup gate; a pair that lost the race or
                // was notified by an earlier pass stays silent.
                if !self.markers.mark(&archive_id, channel)? {
                    continue;
                }
                debug!(archive_id, channel = channel.as_str(), "Overdue notification produced");
                report.notifications.push(OverdueNotification {
                    archive_id: archive_id.clone(),
                    channel,
                    contact: contact.clone(),
                    borrower: loan.borrower.clone(),
                    borrower_name: loan.borrower_name.clone(),
                    due_date: loan.due_date,
                });
            }
        }

        info!(
            checked = report.checked,
            produced = report.notifications.len(),
            "Due-loan scan complete"
        );
        Ok(report)
    }
}

fn map_store_err(err: StoreError) -> WorkflowError {
    match err {
        StoreError::Conflict { key, .. } => WorkflowError::CommitConflict { key },
        StoreError::Backend(msg) => WorkflowError::Storage(msg),
    }
}

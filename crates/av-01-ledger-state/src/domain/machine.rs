//! # Ledger State Machine
//!
//! Implements the archive workflow protocol over the [`VersionedStore`]
//! port. Every operation:
//!
//! 1. checks the caller's role (and ownership where it applies),
//! 2. opens a transaction and validates the record's current state,
//! 3. builds the new record, and
//! 4. commits it with an optimistic version check.
//!
//! On success the operation returns the updated record plus the single
//! event describing the transition. On any failure the transaction is
//! simply dropped; nothing was written.

use crate::domain::authorize;
use crate::domain::requests::{BorrowRequest, RegisterRequest};
use crate::ports::store::{LedgerTx, StoreError, VersionedStore};
use shared_bus::events::{ArchiveEvent, LoanPayload, StatusPayload};
use shared_types::entities::{
    ApprovalEntry, ArchiveRecord, ArchiveStatus, LoanRecord, LoanStatus, LOAN_PERIOD_MS,
    MAX_LOAN_EXTENSIONS,
};
use shared_types::errors::WorkflowError;
use shared_types::roles::{CallerClaims, Role};
use std::sync::Arc;
use tracing::info;

/// The authoritative per-archive state machine.
pub struct LedgerStateMachine {
    store: Arc<dyn VersionedStore>,
}

impl LedgerStateMachine {
    pub fn new(store: Arc<dyn VersionedStore>) -> Self {
        Self { store }
    }

    /// The underlying store, for readers layered on top (audit, cache).
    pub fn store(&self) -> Arc<dyn VersionedStore> {
        self.store.clone()
    }

    /// Register a new archive in Draft.
    ///
    /// Uploaders may only register records they own; Admins may register on
    /// behalf of anyone. The id must be unused.
    pub fn register(
        &self,
        claims: &CallerClaims,
        req: RegisterRequest,
    ) -> Result<(ArchiveRecord, ArchiveEvent), WorkflowError> {
        authorize::require_role(claims, &[Role::Uploader, Role::Admin], "register")?;
        if claims.role == Role::Uploader && req.owner != claims.username {
            return Err(WorkflowError::NotOwner {
                archive_id: req.archive_id,
            });
        }
        if req.status != ArchiveStatus::Draft {
            return Err(WorkflowError::Validation {
                field: "status",
                message: format!("initial status must be Draft, got {}", req.status),
            });
        }
        if req.archive_id.is_empty() {
            return Err(WorkflowError::Validation {
                field: "archive_id",
                message: "archive id must not be empty".to_string(),
            });
        }

        let (tx, current) = self.begin(&req.archive_id)?;
        if current.is_some() {
            return Err(WorkflowError::AlreadyExists {
                archive_id: req.archive_id,
            });
        }

        let record = ArchiveRecord {
            archive_id: req.archive_id,
            cipher_hash: req.cipher_hash,
            blob_locator: req.blob_locator,
            owner: req.owner,
            classification: req.classification,
            status: ArchiveStatus::Draft,
            registered_at: req.timestamp,
            submitted_at: None,
            approved_at: None,
            rejected_at: None,
            uploader_name: req.uploader_name,
            uploader_type: req.uploader_type,
            rejection_note: None,
            approvals: Vec::new(),
            loan: None,
        };

        self.commit(&tx, &record)?;
        info!(archive_id = %record.archive_id, owner = %record.owner, "Archive registered");

        let event = ArchiveEvent::ArchiveRegistered(StatusPayload {
            archive_id: record.archive_id.clone(),
            status: record.status,
        });
        Ok((record, event))
    }

    /// Submit a Draft for approval.
    pub fn submit(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
    ) -> Result<(ArchiveRecord, ArchiveEvent), WorkflowError> {
        authorize::require_role(claims, &[Role::Uploader, Role::Admin], "submit")?;

        let (tx, mut record) = self.begin_existing(archive_id)?;
        if record.status != ArchiveStatus::Draft {
            return Err(WorkflowError::InvalidState {
                archive_id: archive_id.to_string(),
                status: record.status,
                operation: "submit",
            });
        }
        authorize::require_owner_if_uploader(claims, &record)?;

        record.status = ArchiveStatus::Pending;
        record.submitted_at = Some(tx.tx_time);

        self.commit(&tx, &record)?;
        info!(archive_id, "Archive submitted for approval");

        let event = ArchiveEvent::ArchiveSubmitted(StatusPayload {
            archive_id: record.archive_id.clone(),
            status: record.status,
        });
        Ok((record, event))
    }

    /// Approve a Pending archive, appending one approval entry.
    pub fn approve(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
    ) -> Result<(ArchiveRecord, ArchiveEvent), WorkflowError> {
        authorize::require_role(claims, &[Role::Approver], "approve")?;

        let (tx, mut record) = self.begin_existing(archive_id)?;
        if record.status != ArchiveStatus::Pending {
            return Err(WorkflowError::InvalidState {
                archive_id: archive_id.to_string(),
                status: record.status,
                operation: "approve",
            });
        }

        record.status = ArchiveStatus::Approved;
        record.approved_at = Some(tx.tx_time);
        record.approvals.push(ApprovalEntry {
            approver: claims.username.clone(),
            timestamp: tx.tx_time,
        });

        self.commit(&tx, &record)?;
        info!(archive_id, approver = %claims.username, "Archive approved");

        let event = ArchiveEvent::ArchiveApproved(StatusPayload {
            archive_id: record.archive_id.clone(),
            status: record.status,
        });
        Ok((record, event))
    }

    /// Reject a Pending archive with a note.
    pub fn reject(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
        note: &str,
    ) -> Result<(ArchiveRecord, ArchiveEvent), WorkflowError> {
        authorize::require_role(claims, &[Role::Approver], "reject")?;

        let (tx, mut record) = self.begin_existing(archive_id)?;
        if record.status != ArchiveStatus::Pending {
            return Err(WorkflowError::InvalidState {
                archive_id: archive_id.to_string(),
                status: record.status,
                operation: "reject",
            });
        }

        record.status = ArchiveStatus::Rejected;
        record.rejection_note = Some(note.to_string());
        record.rejected_at = Some(tx.tx_time);

        self.commit(&tx, &record)?;
        info!(archive_id, "Archive rejected");

        let event = ArchiveEvent::ArchiveRejected(StatusPayload {
            archive_id: record.archive_id.clone(),
            status: record.status,
        });
        Ok((record, event))
    }

    /// Start a loan on an Approved archive with no loan out.
    ///
    /// Loan start and due date use the transaction time, so every replica
    /// derives the identical due date.
    pub fn borrow(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
        req: BorrowRequest,
    ) -> Result<(ArchiveRecord, ArchiveEvent), WorkflowError> {
        authorize::require_role(claims, &[Role::Borrower], "borrow")?;
        if claims.username.is_empty() {
            return Err(WorkflowError::Validation {
                field: "borrower",
                message: "borrower identity must not be empty".to_string(),
            });
        }

        let (tx, mut record) = self.begin_existing(archive_id)?;
        if record.status != ArchiveStatus::Approved {
            return Err(WorkflowError::InvalidState {
                archive_id: archive_id.to_string(),
                status: record.status,
                operation: "borrow",
            });
        }
        if record.active_loan().is_some() {
            return Err(WorkflowError::ActiveLoanExists {
                archive_id: archive_id.to_string(),
            });
        }

        let loan = LoanRecord {
            borrower: claims.username.clone(),
            borrower_name: req.name,
            borrower_email: req.email,
            borrower_phone: req.phone,
            borrower_type: req.borrower_type,
            status: LoanStatus::Borrowed,
            loan_start: tx.tx_time,
            due_date: tx.tx_time + LOAN_PERIOD_MS,
            extension_count: 0,
            last_extended_at: None,
            returned_at: None,
        };
        record.loan = Some(loan.clone());

        self.commit(&tx, &record)?;
        info!(archive_id, borrower = %claims.username, due_date = loan.due_date, "Loan started");

        let event = ArchiveEvent::ArchiveBorrowed(LoanPayload {
            archive_id: record.archive_id.clone(),
            loan,
        });
        Ok((record, event))
    }

    /// Push the active loan's due date out by one period.
    ///
    /// Only the borrower holding the loan may extend, at most
    /// [`MAX_LOAN_EXTENSIONS`] times; each extension adds the period to the
    /// *current* due date, not the original.
    pub fn extend_loan(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
    ) -> Result<(ArchiveRecord, ArchiveEvent), WorkflowError> {
        authorize::require_role(claims, &[Role::Borrower], "extend a loan")?;

        let (tx, mut record) = self.begin_existing(archive_id)?;
        let Some(loan) = record.loan.as_mut().filter(|l| l.is_active()) else {
            return Err(WorkflowError::NoActiveLoan {
                archive_id: archive_id.to_string(),
            });
        };
        authorize::require_same_borrower(claims, archive_id, &loan.borrower)?;
        if loan.extension_count >= MAX_LOAN_EXTENSIONS {
            return Err(WorkflowError::MaxExtensionsReached {
                archive_id: archive_id.to_string(),
            });
        }

        loan.due_date += LOAN_PERIOD_MS;
        loan.extension_count += 1;
        loan.last_extended_at = Some(tx.tx_time);
        let loan = loan.clone();

        self.commit(&tx, &record)?;
        info!(
            archive_id,
            due_date = loan.due_date,
            extension = loan.extension_count,
            "Loan extended"
        );

        let event = ArchiveEvent::LoanExtended(LoanPayload {
            archive_id: record.archive_id.clone(),
            loan,
        });
        Ok((record, event))
    }

    /// Return the active loan.
    pub fn return_loan(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
    ) -> Result<(ArchiveRecord, ArchiveEvent), WorkflowError> {
        authorize::require_role(claims, &[Role::Borrower], "return a loan")?;

        let (tx, mut record) = self.begin_existing(archive_id)?;
        let Some(loan) = record.loan.as_mut().filter(|l| l.is_active()) else {
            return Err(WorkflowError::NoActiveLoan {
                archive_id: archive_id.to_string(),
            });
        };
        authorize::require_same_borrower(claims, archive_id, &loan.borrower)?;

        loan.status = LoanStatus::Returned;
        loan.returned_at = Some(tx.tx_time);
        let loan = loan.clone();

        self.commit(&tx, &record)?;
        info!(archive_id, "Loan returned");

        let event = ArchiveEvent::LoanReturned(LoanPayload {
            archive_id: record.archive_id.clone(),
            loan,
        });
        Ok((record, event))
    }

    /// Read the full current record.
    ///
    /// Any role may read, except that Uploaders see only their own records.
    pub fn get_archive(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
    ) -> Result<ArchiveRecord, WorkflowError> {
        let current =
            self.store
                .current(archive_id)
                .map_err(map_store_err)?
                .ok_or_else(|| WorkflowError::NotFound {
                    archive_id: archive_id.to_string(),
                })?;
        let record = decode(&current.bytes)?;
        authorize::require_owner_if_uploader(claims, &record)?;
        Ok(record)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn begin(&self, key: &str) -> Result<(LedgerTx, Option<ArchiveRecord>), WorkflowError> {
        let (tx, current) = self.store.begin(key).map_err(map_store_err)?;
        let record = current.map(|v| decode(&v.bytes)).transpose()?;
        Ok((tx, record))
    }

    fn begin_existing(&self, key: &str) -> Result<(LedgerTx, ArchiveRecord), WorkflowError> {
        let (tx, record) = self.begin(key)?;
        let record = record.ok_or_else(|| WorkflowError::NotFound {
            archive_id: key.to_string(),
        })?;
        Ok((tx, record))
    }

    fn commit(&self, tx: &LedgerTx, record: &ArchiveRecord) -> Result<(), WorkflowError> {
        let bytes =
            serde_json::to_vec(record).map_err(|e| WorkflowError::Serialization(e.to_string()))?;
        self.store.commit(tx, bytes).map_err(map_store_err)?;
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Result<ArchiveRecord, WorkflowError> {
    serde_json::from_slice(bytes).map_err(|e| WorkflowError::Serialization(e.to_string()))
}

fn map_store_err(err: StoreError) -> WorkflowError {
    match err {
        StoreError::Conflict { key, .. } => WorkflowError::CommitConflict { key },
        StoreError::Backend(msg) => WorkflowError::Storage(msg),
    }
}

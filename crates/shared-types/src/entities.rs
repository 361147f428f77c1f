//! # Domain Entities
//!
//! The archive record and its embedded loan, exactly as they are stored on
//! the ledger (JSON-serialized). Document bytes never appear here; the record
//! carries only the content digest and the opaque blob locator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds since the Unix epoch.
///
/// Integer arithmetic keeps due-date computation bit-identical across
/// replicas, which a wall-clock representation would not.
pub type Timestamp = u64;

/// Fixed loan period: 7 days.
pub const LOAN_PERIOD_MS: Timestamp = 7 * 24 * 60 * 60 * 1000;

/// A loan may be extended at most twice.
pub const MAX_LOAN_EXTENSIONS: u8 = 2;

/// Workflow status of an archive.
///
/// Legal edges: Draft → Pending → {Approved, Rejected}. Approved records
/// additionally cycle through loan substates without leaving Approved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ArchiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArchiveStatus::Draft => "Draft",
            ArchiveStatus::Pending => "Pending",
            ArchiveStatus::Approved => "Approved",
            ArchiveStatus::Rejected => "Rejected",
        };
        f.write_str(s)
    }
}

/// Status of the embedded loan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    Borrowed,
    Returned,
}

/// One approval, appended when an Approver approves the archive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEntry {
    /// Identity of the approving caller.
    pub approver: String,
    /// Ledger commit time of the approval.
    pub timestamp: Timestamp,
}

/// The lending state embedded in an archive record.
///
/// At most one loan exists at a time; a new borrow cycle replaces the
/// previous (Returned) loan wholesale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    /// Borrower identity (claims username). Authoritative for same-borrower
    /// checks on extend/return.
    pub borrower: String,
    pub borrower_name: String,
    pub borrower_email: String,
    pub borrower_phone: String,
    pub borrower_type: String,
    pub status: LoanStatus,
    /// Ledger commit time of the borrow.
    pub loan_start: Timestamp,
    /// `loan_start + 7 days`, moved forward 7 days per extension.
    pub due_date: Timestamp,
    /// Number of extensions taken, never above [`MAX_LOAN_EXTENSIONS`].
    pub extension_count: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_extended_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<Timestamp>,
}

impl LoanRecord {
    /// Whether this loan is still out.
    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Borrowed
    }

    /// Whether the loan is active and at or past due at `now`.
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        self.is_active() && self.due_date <= now
    }
}

/// One archive's authoritative ledger state.
///
/// Created once at registration, mutated in place by every later operation,
/// never deleted. The full version history is retained by the ledger and
/// replayed by the audit trail reader.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    /// Opaque unique id, immutable after registration.
    pub archive_id: String,
    /// SHA-256 digest (hex) of the encrypted blob, for integrity cross-check.
    pub cipher_hash: String,
    /// Content address returned by the blob store. Never interpreted here.
    pub blob_locator: String,
    /// Owner identity, set once at registration.
    pub owner: String,
    /// Free-form classification label.
    pub classification: String,
    pub status: ArchiveStatus,
    /// Registration timestamp supplied by the service tier.
    pub registered_at: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_type: Option<String>,
    /// Set only when status is Rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_note: Option<String>,
    /// Append-only approval log.
    pub approvals: Vec<ApprovalEntry>,
    /// Current (or most recent) loan, if any borrow ever happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan: Option<LoanRecord>,
}

impl ArchiveRecord {
    /// The active loan, if one is out.
    pub fn active_loan(&self) -> Option<&LoanRecord> {
        self.loan.as_ref().filter(|l| l.is_active())
    }
}

//! # Workflow Error Taxonomy
//!
//! Every state-machine operation fails with exactly one of these kinds.
//! A failure aborts the whole operation; no partial state is ever committed.

use crate::entities::ArchiveStatus;
use crate::roles::Role;
use thiserror::Error;

/// Errors surfaced by the archive workflow core.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// The caller's role is not permitted to run this operation.
    #[error("role {role} is not permitted to {operation}")]
    RoleNotPermitted { role: Role, operation: &'static str },

    /// An Uploader acted on a record it does not own.
    #[error("caller is not the owner of archive {archive_id}")]
    NotOwner { archive_id: String },

    /// A Borrower acted on a loan held by someone else.
    #[error("caller is not the borrower of the active loan on archive {archive_id}")]
    NotSameBorrower { archive_id: String },

    /// No record exists under this archive id.
    #[error("archive not found: {archive_id}")]
    NotFound { archive_id: String },

    /// Registration attempted under an id that is already taken.
    #[error("archive already exists: {archive_id}")]
    AlreadyExists { archive_id: String },

    /// The operation is not legal from the record's current status.
    #[error("archive {archive_id} is {status}, cannot {operation}")]
    InvalidState {
        archive_id: String,
        status: ArchiveStatus,
        operation: &'static str,
    },

    /// A borrow was attempted while a loan is still out.
    #[error("archive {archive_id} already has an active loan")]
    ActiveLoanExists { archive_id: String },

    /// Extend or return was attempted with no loan out.
    #[error("archive {archive_id} has no active loan")]
    NoActiveLoan { archive_id: String },

    /// The loan has already been extended the maximum number of times.
    #[error("loan on archive {archive_id} reached the maximum number of extensions")]
    MaxExtensionsReached { archive_id: String },

    /// A required argument is missing or malformed.
    #[error("validation failed for {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// A concurrent writer committed first; the caller may resubmit.
    #[error("optimistic commit conflict on key {key}, resubmit the operation")]
    CommitConflict { key: String },

    /// The ledger substrate failed.
    #[error("ledger storage error: {0}")]
    Storage(String),

    /// A stored record could not be (de)serialized.
    #[error("record serialization error: {0}")]
    Serialization(String),
}

impl WorkflowError {
    /// Whether this failure is an authorization failure (role or ownership).
    ///
    /// The service tier maps these to a single externally visible
    /// "forbidden" outcome without leaking which rule tripped.
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            WorkflowError::RoleNotPermitted { .. }
                | WorkflowError::NotOwner { .. }
                | WorkflowError::NotSameBorrower { .. }
        )
    }

    /// Whether resubmitting the same operation could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::CommitConflict { .. })
    }
}

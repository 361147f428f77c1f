//! # Authorization Rules
//!
//! Pure functions of (claims, record, operation). No ambient identity, no
//! lookups: the verified claims passed into the operation are the whole
//! authorization input.

use shared_types::entities::ArchiveRecord;
use shared_types::errors::WorkflowError;
use shared_types::roles::{CallerClaims, Role};

/// Require the caller to hold one of the listed roles.
pub fn require_role(
    claims: &CallerClaims,
    allowed: &[Role],
    operation: &'static str,
) -> Result<(), WorkflowError> {
    if claims.has_any_role(allowed) {
        Ok(())
    } else {
        Err(WorkflowError::RoleNotPermitted {
            role: claims.role,
            operation,
        })
    }
}

/// Uploaders may only touch records they own; Admins pass unconditionally.
pub fn require_owner_if_uploader(
    claims: &CallerClaims,
    record: &ArchiveRecord,
) -> Result<(), WorkflowError> {
    if claims.role == Role::Uploader && record.owner != claims.username {
        return Err(WorkflowError::NotOwner {
            archive_id: record.archive_id.clone(),
        });
    }
    Ok(())
}

/// Extend/return are restricted to the borrower who holds the active loan.
pub fn require_same_borrower(
    claims: &CallerClaims,
    archive_id: &str,
    borrower: &str,
) -> Result<(), WorkflowError> {
    if borrower != claims.username {
        return Err(WorkflowError::NotSameBorrower {
            archive_id: archive_id.to_string(),
        });
    }
    Ok(())
}

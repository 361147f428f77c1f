//! Operation argument bundles, in the parameter order of the contract
//! surface consumed by the transport layer.

use serde::{Deserialize, Serialize};
use shared_types::entities::{ArchiveStatus, Timestamp};

/// Arguments for [`crate::LedgerStateMachine::register`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub archive_id: String,
    /// SHA-256 digest (hex) of the encrypted blob.
    pub cipher_hash: String,
    /// Content address returned by the blob store.
    pub blob_locator: String,
    pub owner: String,
    pub classification: String,
    /// Must be `Draft`; anything else is rejected at validation.
    pub status: ArchiveStatus,
    /// Registration timestamp supplied by the service tier.
    pub timestamp: Timestamp,
    pub uploader_name: Option<String>,
    pub uploader_type: Option<String>,
}

/// Arguments for [`crate::LedgerStateMachine::borrow`].
///
/// The borrower identity itself comes from the verified claims, not from
/// these descriptive fields.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BorrowRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub borrower_type: String,
}

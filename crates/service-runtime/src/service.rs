//! # Archive Service Facade
//!
//! One entry point per externally visible operation. The facade owns the
//! seam between the three storage domains:
//!
//! - the **ledger** holds workflow state and the ciphertext hash,
//! - the **blob store** holds sealed document bytes,
//! - the **wrapped-secret store** holds key material, wrapped under the
//!   master secret that only this tier possesses.
//!
//! Every successful mutation publishes its event on the bus and refreshes
//! the consistency cache. Event delivery is fire-and-forget.

use av_01_ledger_state::{
    BorrowRequest, LedgerStateMachine, RegisterRequest, TimeSource, VersionedStore,
};
use av_02_envelope_vault::{document, EnvelopeKeyVault, VaultError, WrappedSecretStore};
use av_03_audit_trail::{AuditEntry, AuditTrailReader};
use av_04_consistency_cache::{ConsistencyCache, Listing};
use av_05_loan_watch::{LoanWatch, NotificationMarkerStore, ScanReport};
use shared_bus::events::ArchiveEvent;
use shared_bus::publisher::EventPublisher;
use shared_types::entities::{ArchiveRecord, ArchiveStatus};
use shared_types::errors::WorkflowError;
use shared_types::roles::{CallerClaims, Role};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::blobstore::{BlobError, BlobStore};

/// Failures surfaced to the transport layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Workflow or authorization failure from the state machine
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Vault failure; on a read path this signals tampering or
    /// configuration drift and must never be swallowed
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Blob store failure
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// Stored bytes no longer match the hash recorded on the ledger
    #[error("Stored document failed integrity check for archive '{archive_id}'")]
    IntegrityMismatch { archive_id: String },

    /// Sealed bytes vanished from the blob store
    #[error("No document bytes at locator '{locator}'")]
    BlobMissing { locator: String },
}

/// Arguments for [`ArchiveService::ingest`].
pub struct IngestRequest {
    /// Caller-supplied id; a fresh one is generated when absent
    pub archive_id: Option<String>,
    /// Plaintext document bytes
    pub document: Vec<u8>,
    pub classification: String,
    pub uploader_name: Option<String>,
    pub uploader_type: Option<String>,
}

/// The assembled service tier.
pub struct ArchiveService {
    machine: LedgerStateMachine,
    vault: EnvelopeKeyVault,
    secrets: Arc<dyn WrappedSecretStore>,
    blobs: Arc<dyn BlobStore>,
    audit: AuditTrailReader,
    cache: Arc<ConsistencyCache>,
    watch: LoanWatch,
    bus: Arc<dyn EventPublisher>,
    time: Arc<dyn TimeSource>,
}

impl ArchiveService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn VersionedStore>,
        vault: EnvelopeKeyVault,
        secrets: Arc<dyn WrappedSecretStore>,
        blobs: Arc<dyn BlobStore>,
        markers: Arc<dyn NotificationMarkerStore>,
        bus: Arc<dyn EventPublisher>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            machine: LedgerStateMachine::new(store.clone()),
            vault,
            secrets,
            blobs,
            audit: AuditTrailReader::new(store.clone()),
            cache: Arc::new(ConsistencyCache::new(store.clone())),
            watch: LoanWatch::new(store, markers),
            bus,
            time,
        }
    }

    /// Seal, store, and register a new document in one pass.
    ///
    /// Order matters: the sealed bytes and wrapped key material are
    /// persisted before the ledger registration, so a failed registration
    /// leaves an orphaned blob (harmless, content-addressed) rather than a
    /// ledger record pointing at nothing.
    pub async fn ingest(
        &self,
        claims: &CallerClaims,
        req: IngestRequest,
    ) -> Result<ArchiveRecord, ServiceError> {
        let archive_id = req
            .archive_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let sealed = document::seal(&req.document)?;
        let blob_locator = self.blobs.put(&sealed.cipher_text)?;

        let wrapped = self.vault.wrap_key_material(&sealed.key_material)?;
        self.secrets.put(&archive_id, wrapped)?;

        let register = RegisterRequest {
            archive_id,
            cipher_hash: sealed.cipher_hash,
            blob_locator,
            owner: claims.username.clone(),
            classification: req.classification,
            status: ArchiveStatus::Draft,
            timestamp: self.time.now(),
            uploader_name: req.uploader_name,
            uploader_type: req.uploader_type,
        };
        let (record, event) = self.machine.register(claims, register)?;

        info!(archive_id = %record.archive_id, "Document ingested");
        self.finish(&record.archive_id, event).await;
        Ok(record)
    }

    pub async fn submit(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
    ) -> Result<ArchiveRecord, ServiceError> {
        let (record, event) = self.machine.submit(claims, archive_id)?;
        self.finish(archive_id, event).await;
        Ok(record)
    }

    pub async fn approve(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
    ) -> Result<ArchiveRecord, ServiceError> {
        let (record, event) = self.machine.approve(claims, archive_id)?;
        self.finish(archive_id, event).await;
        Ok(record)
    }

    pub async fn reject(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
        note: &str,
    ) -> Result<ArchiveRecord, ServiceError> {
        let (record, event) = self.machine.reject(claims, archive_id, note)?;
        self.finish(archive_id, event).await;
        Ok(record)
    }

    pub async fn borrow(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
        req: BorrowRequest,
    ) -> Result<ArchiveRecord, ServiceError> {
        let (record, event) = self.machine.borrow(claims, archive_id, req)?;
        self.finish(archive_id, event).await;
        Ok(record)
    }

    pub async fn extend_loan(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
    ) -> Result<ArchiveRecord, ServiceError> {
        let (record, event) = self.machine.extend_loan(claims, archive_id)?;
        self.finish(archive_id, event).await;
        Ok(record)
    }

    pub async fn return_loan(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
    ) -> Result<ArchiveRecord, ServiceError> {
        let (record, event) = self.machine.return_loan(claims, archive_id)?;
        self.finish(archive_id, event).await;
        Ok(record)
    }

    /// Current record, with the state machine's read-visibility rules.
    pub fn get(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
    ) -> Result<ArchiveRecord, ServiceError> {
        Ok(self.machine.get_archive(claims, archive_id)?)
    }

    /// Role-scoped listing through the consistency cache.
    pub fn list(&self, claims: &CallerClaims) -> Result<Listing, ServiceError> {
        Ok(self.cache.list(claims)?)
    }

    /// Full version history. Admin/Approver/Auditor only.
    pub fn audit_trail(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
    ) -> Result<Vec<AuditEntry>, ServiceError> {
        Ok(self.audit.history(claims, archive_id)?)
    }

    /// Decrypt and return a document's plaintext bytes.
    ///
    /// Allowed for Admin/Approver/Auditor, for the owning Uploader, and for
    /// the Borrower currently holding the loan. The stored ciphertext is
    /// checked against the ledger's recorded hash before any key material
    /// is unwrapped.
    pub fn fetch_document(
        &self,
        claims: &CallerClaims,
        archive_id: &str,
    ) -> Result<Vec<u8>, ServiceError> {
        let record = self.machine.get_archive(claims, archive_id)?;

        if claims.role == Role::Borrower {
            let holds_loan = record
                .active_loan()
                .is_some_and(|loan| loan.borrower == claims.username);
            if !holds_loan {
                return Err(WorkflowError::RoleNotPermitted {
                    role: claims.role,
                    operation: "fetch document",
                }
                .into());
            }
        }

        let cipher_text = self
            .blobs
            .get(&record.blob_locator)?
            .ok_or_else(|| ServiceError::BlobMissing {
                locator: record.blob_locator.clone(),
            })?;
        if document::cipher_hash(&cipher_text) != record.cipher_hash {
            return Err(ServiceError::IntegrityMismatch {
                archive_id: archive_id.to_string(),
            });
        }

        let wrapped = self
            .secrets
            .get(archive_id)?
            .ok_or_else(|| VaultError::MaterialNotFound {
                archive_id: archive_id.to_string(),
            })?;
        let material = self.vault.unwrap_key_material(&wrapped)?;

        Ok(document::open(&cipher_text, &material)?)
    }

    /// One due-loan scan pass at the given time.
    pub fn due_scan(&self) -> Result<ScanReport, ServiceError> {
        Ok(self.watch.scan(self.time.now())?)
    }

    /// Warm the consistency cache from the ledger.
    pub fn warm_cache(&self) -> Result<usize, ServiceError> {
        Ok(self.cache.warm()?)
    }

    async fn finish(&self, archive_id: &str, event: ArchiveEvent) {
        // Cache refresh failure degrades listings but must not fail the
        // already committed mutation.
        if let Err(err) = self.cache.reconcile(archive_id) {
            error!(archive_id, error = %err, "Cache reconcile failed after commit");
        }
        self.bus.publish(event).await;
    }
}

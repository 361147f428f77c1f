//! # Integration Test Flows
//!
//! Exercises the full service tier with every subsystem wired together:
//! ledger state machine, envelope vault, blob store, audit reader,
//! consistency cache, loan watch, and the event bus.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use av_01_ledger_state::{
        BorrowRequest, FixedTimeSource, InMemoryLedger, TimeSource, VersionedStore,
    };
    use av_02_envelope_vault::{
        EnvelopeKeyVault, InMemoryWrappedSecretStore, MasterSecret, WrappedSecretStore,
    };
    use av_05_loan_watch::{InMemoryMarkerStore, NotificationChannel, NotificationMarkerStore};
    use service_runtime::blobstore::{BlobStore, InMemoryBlobStore};
    use service_runtime::{ArchiveService, IngestRequest, ServiceError};
    use shared_bus::events::{ArchiveEvent, EventFilter, EventTopic};
    use shared_bus::publisher::InMemoryEventBus;
    use shared_types::entities::{ArchiveStatus, LoanStatus, LOAN_PERIOD_MS, MAX_LOAN_EXTENSIONS};
    use shared_types::errors::WorkflowError;
    use shared_types::roles::{CallerClaims, Role};

    const START: u64 = 1_700_000_000_000;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    struct World {
        service: ArchiveService,
        bus: Arc<InMemoryEventBus>,
        clock: Arc<FixedTimeSource>,
        ledger: Arc<InMemoryLedger>,
        secrets: Arc<InMemoryWrappedSecretStore>,
        blobs: Arc<InMemoryBlobStore>,
        markers: Arc<InMemoryMarkerStore>,
        master: MasterSecret,
    }

    fn world() -> World {
        let clock = Arc::new(FixedTimeSource::new(START));
        let bus = Arc::new(InMemoryEventBus::new());
        let ledger = Arc::new(InMemoryLedger::new(clock.clone()));
        let secrets = Arc::new(InMemoryWrappedSecretStore::new());
        let blobs = Arc::new(InMemoryBlobStore::new());
        let markers = Arc::new(InMemoryMarkerStore::new());
        let master = MasterSecret::generate();

        let service = ArchiveService::new(
            ledger.clone() as Arc<dyn VersionedStore>,
            EnvelopeKeyVault::new(master.clone()),
            secrets.clone() as Arc<dyn WrappedSecretStore>,
            blobs.clone() as Arc<dyn BlobStore>,
            markers.clone() as Arc<dyn NotificationMarkerStore>,
            bus.clone(),
            clock.clone(),
        );

        World {
            service,
            bus,
            clock,
            ledger,
            secrets,
            blobs,
            markers,
            master,
        }
    }

    fn uploader() -> CallerClaims {
        CallerClaims::new("sari", Role::Uploader)
    }

    fn approver() -> CallerClaims {
        CallerClaims::new("rani", Role::Approver)
    }

    fn auditor() -> CallerClaims {
        CallerClaims::new("dewi", Role::Auditor)
    }

    fn borrower() -> CallerClaims {
        CallerClaims::new("budi", Role::Borrower)
    }

    fn ingest_req(doc: &[u8]) -> IngestRequest {
        IngestRequest {
            archive_id: None,
            document: doc.to_vec(),
            classification: "confidential".into(),
            uploader_name: Some("Sari Dewi".into()),
            uploader_type: Some("staff".into()),
        }
    }

    fn borrow_req() -> BorrowRequest {
        BorrowRequest {
            name: "Budi Santoso".into(),
            email: "budi@example.org".into(),
            phone: "+62-811-0001".into(),
            borrower_type: "external".into(),
        }
    }

    async fn approved(world: &World, doc: &[u8]) -> String {
        let record = world
            .service
            .ingest(&uploader(), ingest_req(doc))
            .await
            .unwrap();
        let id = record.archive_id;
        world.service.submit(&uploader(), &id).await.unwrap();
        world.service.approve(&approver(), &id).await.unwrap();
        id
    }

    // =========================================================================
    // END-TO-END LIFECYCLE
    // =========================================================================

    #[tokio::test]
    async fn test_full_document_lifecycle() {
        let world = world();
        let plaintext = b"site survey, restricted distribution";

        // Ingest: sealed bytes land in the blob store, never the plaintext.
        let record = world
            .service
            .ingest(&uploader(), ingest_req(plaintext))
            .await
            .unwrap();
        let id = record.archive_id.clone();
        let stored = world.blobs.get(&record.blob_locator).unwrap().unwrap();
        assert_ne!(stored.as_slice(), plaintext.as_slice());

        // Draft → Pending → Approved.
        world.service.submit(&uploader(), &id).await.unwrap();
        let record = world.service.approve(&approver(), &id).await.unwrap();
        assert_eq!(record.status, ArchiveStatus::Approved);
        assert_eq!(record.approvals.len(), 1);

        // Borrow, read as the borrower, extend to the cap.
        world.clock.advance(60_000);
        let record = world
            .service
            .borrow(&borrower(), &id, borrow_req())
            .await
            .unwrap();
        let due = record.active_loan().unwrap().due_date;
        assert_eq!(due, world.clock.now() + LOAN_PERIOD_MS);

        assert_eq!(
            world.service.fetch_document(&borrower(), &id).unwrap(),
            plaintext
        );

        for _ in 0..MAX_LOAN_EXTENSIONS {
            world.service.extend_loan(&borrower(), &id).await.unwrap();
        }
        let err = world.service.extend_loan(&borrower(), &id).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Workflow(WorkflowError::MaxExtensionsReached { .. })
        ));

        // Return closes the loan; the record stays queryable forever.
        let record = world.service.return_loan(&borrower(), &id).await.unwrap();
        assert_eq!(record.loan.as_ref().unwrap().status, LoanStatus::Returned);
        assert!(record.active_loan().is_none());

        // A fresh loan starts a clean extension budget.
        let record = world
            .service
            .borrow(&borrower(), &id, borrow_req())
            .await
            .unwrap();
        assert_eq!(record.active_loan().unwrap().extension_count, 0);
    }

    #[tokio::test]
    async fn test_rejection_is_terminal_but_queryable() {
        let world = world();
        let record = world
            .service
            .ingest(&uploader(), ingest_req(b"incomplete filing"))
            .await
            .unwrap();
        let id = record.archive_id;

        world.service.submit(&uploader(), &id).await.unwrap();
        let record = world
            .service
            .reject(&approver(), &id, "classification missing")
            .await
            .unwrap();
        assert_eq!(record.status, ArchiveStatus::Rejected);
        assert_eq!(record.rejection_note.as_deref(), Some("classification missing"));

        // No transition leaves Rejected.
        assert!(world.service.submit(&uploader(), &id).await.is_err());
        assert!(world
            .service
            .borrow(&borrower(), &id, borrow_req())
            .await
            .is_err());

        // Still readable, and the trail shows all three versions.
        assert!(world.service.get(&uploader(), &id).is_ok());
        let trail = world.service.audit_trail(&auditor(), &id).unwrap();
        let statuses: Vec<ArchiveStatus> = trail
            .iter()
            .map(|e| e.snapshot.as_ref().unwrap().status)
            .collect();
        assert_eq!(
            statuses,
            [
                ArchiveStatus::Draft,
                ArchiveStatus::Pending,
                ArchiveStatus::Rejected
            ]
        );
    }

    // =========================================================================
    // KEY CUSTODY
    // =========================================================================

    #[tokio::test]
    async fn test_wrong_master_secret_cannot_open_documents() {
        let world = world();
        let id = approved(&world, b"ciphered payload").await;

        // Same stores, different master secret: simulates a misconfigured
        // replacement process coming up against existing data.
        let misconfigured = ArchiveService::new(
            world.ledger.clone() as Arc<dyn VersionedStore>,
            EnvelopeKeyVault::new(MasterSecret::generate()),
            world.secrets.clone() as Arc<dyn WrappedSecretStore>,
            world.blobs.clone() as Arc<dyn BlobStore>,
            world.markers.clone() as Arc<dyn NotificationMarkerStore>,
            world.bus.clone(),
            world.clock.clone(),
        );

        let err = misconfigured.fetch_document(&auditor(), &id).unwrap_err();
        assert!(matches!(err, ServiceError::Vault(_)));

        // The correctly configured service still reads fine.
        assert_eq!(
            world.service.fetch_document(&auditor(), &id).unwrap(),
            b"ciphered payload"
        );
    }

    #[tokio::test]
    async fn test_restart_with_same_master_secret_keeps_custody() {
        let world = world();
        let id = approved(&world, b"survives restarts").await;

        // New service instance over the same persisted state.
        let restarted = ArchiveService::new(
            world.ledger.clone() as Arc<dyn VersionedStore>,
            EnvelopeKeyVault::new(world.master.clone()),
            world.secrets.clone() as Arc<dyn WrappedSecretStore>,
            world.blobs.clone() as Arc<dyn BlobStore>,
            world.markers.clone() as Arc<dyn NotificationMarkerStore>,
            world.bus.clone(),
            world.clock.clone(),
        );
        restarted.warm_cache().unwrap();

        assert_eq!(
            restarted.fetch_document(&auditor(), &id).unwrap(),
            b"survives restarts"
        );
        assert_eq!(restarted.list(&auditor()).unwrap().records.len(), 1);
    }

    /// Blob store that hands back corrupted bytes for every locator.
    struct TamperedBlobStore;

    impl BlobStore for TamperedBlobStore {
        fn put(&self, _bytes: &[u8]) -> Result<String, service_runtime::blobstore::BlobError> {
            Ok("tampered".into())
        }

        fn get(
            &self,
            _locator: &str,
        ) -> Result<Option<Vec<u8>>, service_runtime::blobstore::BlobError> {
            Ok(Some(b"not the sealed bytes".to_vec()))
        }
    }

    #[tokio::test]
    async fn test_tampered_blob_is_rejected_before_decryption() {
        let world = world();
        let record = world
            .service
            .ingest(&uploader(), ingest_req(b"original"))
            .await
            .unwrap();

        // Same ledger and secrets, but the blob layer lies: the hash check
        // against the ledger record must fail before any unwrap happens.
        let tampered = ArchiveService::new(
            world.ledger.clone() as Arc<dyn VersionedStore>,
            EnvelopeKeyVault::new(world.master.clone()),
            world.secrets.clone() as Arc<dyn WrappedSecretStore>,
            Arc::new(TamperedBlobStore),
            world.markers.clone() as Arc<dyn NotificationMarkerStore>,
            world.bus.clone(),
            world.clock.clone(),
        );

        let err = tampered
            .fetch_document(&uploader(), &record.archive_id)
            .unwrap_err();
        assert!(matches!(err, ServiceError::IntegrityMismatch { .. }));
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    #[tokio::test]
    async fn test_loan_topic_filter_sees_only_loan_events() {
        let world = world();
        let mut loan_sub = world.bus.subscribe(EventFilter::topics(vec![EventTopic::Loan]));

        let id = approved(&world, b"doc").await;
        world
            .service
            .borrow(&borrower(), &id, borrow_req())
            .await
            .unwrap();
        world.service.return_loan(&borrower(), &id).await.unwrap();

        let mut names = Vec::new();
        while let Ok(Some(event)) = loan_sub.try_recv() {
            assert!(matches!(
                event,
                ArchiveEvent::ArchiveBorrowed(_)
                    | ArchiveEvent::LoanExtended(_)
                    | ArchiveEvent::LoanReturned(_)
            ));
            names.push(event.name().to_string());
        }
        assert_eq!(names, ["ArchiveBorrowed", "LoanReturned"]);
    }

    // =========================================================================
    // CONCURRENCY
    // =========================================================================

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_borrowers_get_exactly_one_loan() {
        let world = world();
        let id = approved(&world, b"contested").await;
        let service = Arc::new(world.service);

        let mut handles = Vec::new();
        for name in ["budi", "tini", "eko", "wati"] {
            let service = service.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let claims = CallerClaims::new(name, Role::Borrower);
                service.borrow(&claims, &id, BorrowRequest::default()).await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(ServiceError::Workflow(
                    WorkflowError::ActiveLoanExists { .. }
                    | WorkflowError::CommitConflict { .. },
                )) => {}
                Err(other) => panic!("unexpected failure: {other}"),
            }
        }
        assert_eq!(winners, 1);

        let record = service.get(&auditor(), &id).unwrap();
        assert!(record.active_loan().is_some());
    }

    // =========================================================================
    // DUE-LOAN WATCH
    // =========================================================================

    #[tokio::test]
    async fn test_overdue_scan_dedups_per_channel_forever() {
        let world = world();
        let id = approved(&world, b"doc").await;
        world
            .service
            .borrow(&borrower(), &id, borrow_req())
            .await
            .unwrap();

        // Not yet due.
        world.clock.advance(LOAN_PERIOD_MS - 1);
        assert!(world.service.due_scan().unwrap().notifications.is_empty());

        // Due: one notification per contact channel.
        world.clock.advance(1);
        let report = world.service.due_scan().unwrap();
        let mut channels: Vec<NotificationChannel> =
            report.notifications.iter().map(|n| n.channel).collect();
        channels.sort_by_key(|c| c.as_str());
        assert_eq!(
            channels,
            [NotificationChannel::Email, NotificationChannel::Phone]
        );

        // Later scans stay silent even though the loan is still overdue.
        world.clock.advance(LOAN_PERIOD_MS);
        assert!(world.service.due_scan().unwrap().notifications.is_empty());
    }
}

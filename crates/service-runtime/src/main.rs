//! # Archive Service Binary
//!
//! Startup sequence:
//!
//! 1. Install telemetry
//! 2. Load and validate configuration (fatal on a bad master secret)
//! 3. Wire storage adapters, vault, bus, and the service facade
//! 4. Warm the consistency cache from the ledger
//! 5. Run the periodic due-loan scan until shutdown

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use av_01_ledger_state::{InMemoryLedger, SystemTimeSource};
use av_02_envelope_vault::{EnvelopeKeyVault, InMemoryWrappedSecretStore};
use av_05_loan_watch::InMemoryMarkerStore;
use service_runtime::blobstore::InMemoryBlobStore;
use service_runtime::{ArchiveService, ServiceConfig};
use shared_bus::publisher::InMemoryEventBus;

#[tokio::main]
async fn main() -> Result<()> {
    service_runtime::telemetry::init();
    info!("Starting archive service");

    let config = ServiceConfig::from_env().context("failed to load configuration")?;

    let time = Arc::new(SystemTimeSource);
    let service = Arc::new(ArchiveService::new(
        Arc::new(InMemoryLedger::new(time.clone())),
        EnvelopeKeyVault::new(config.master_secret.clone()),
        Arc::new(InMemoryWrappedSecretStore::new()),
        Arc::new(InMemoryBlobStore::new()),
        Arc::new(InMemoryMarkerStore::new()),
        Arc::new(InMemoryEventBus::new()),
        time,
    ));

    let warmed = service.warm_cache().context("cache warm failed")?;
    info!(rows = warmed, "Consistency cache warmed");

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);

    let scan_service = service.clone();
    let scan_interval = Duration::from_secs(config.scan_interval_secs);
    let scanner = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(scan_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match scan_service.due_scan() {
                        Ok(report) => info!(
                            checked = report.checked,
                            produced = report.notifications.len(),
                            "Due-loan scan finished"
                        ),
                        Err(err) => error!(error = %err, "Due-loan scan failed"),
                    }
                }
                _ = shutdown_rx.changed() => break,
            }
        }
    });

    info!("Archive service ready");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = scanner.await;
    info!("Archive service stopped");
    Ok(())
}

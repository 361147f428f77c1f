//! # Archive Service Runtime
//!
//! The service tier for the confidential-archive system. Everything a
//! transport layer needs is behind [`ArchiveService`]:
//!
//! - workflow mutations through the ledger state machine
//! - document sealing/opening next to the blob store, with key material
//!   custody through the envelope vault
//! - audit history and cached role-scoped listings
//! - the periodic due-loan scan
//!
//! The runtime holds the only copy of the master secret; nothing below this
//! crate ever sees unwrapped document keys.

pub mod blobstore;
pub mod config;
pub mod service;
pub mod telemetry;

pub use blobstore::{BlobStore, InMemoryBlobStore};
pub use config::{ConfigError, ServiceConfig};
pub use service::{ArchiveService, IngestRequest, ServiceError};

//! # Blob Store Port
//!
//! Content-addressed storage for sealed document bytes. The ledger only
//! ever sees the locator; the bytes themselves live here.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;

/// Blob store failures.
#[derive(Debug, Error)]
pub enum BlobError {
    /// Backend failure
    #[error("Blob store error: {0}")]
    Backend(String),
}

/// Content-addressed storage for opaque byte blobs.
pub trait BlobStore: Send + Sync {
    /// Store bytes, returning their locator. Storing the same bytes twice
    /// returns the same locator.
    fn put(&self, bytes: &[u8]) -> Result<String, BlobError>;

    /// Fetch bytes by locator.
    fn get(&self, locator: &str) -> Result<Option<Vec<u8>>, BlobError>;
}

/// In-memory reference adapter, addressed by hex SHA-256.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> BlobError {
        BlobError::Backend("blob store lock poisoned".to_string())
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<String, BlobError> {
        let locator = hex::encode(Sha256::digest(bytes));
        let mut blobs = self.blobs.write().map_err(|_| Self::lock_poisoned())?;
        blobs.entry(locator.clone()).or_insert_with(|| bytes.to_vec());
        debug!(locator = %locator, size = bytes.len(), "Blob stored");
        Ok(locator)
    }

    fn get(&self, locator: &str) -> Result<Option<Vec<u8>>, BlobError> {
        let blobs = self.blobs.read().map_err(|_| Self::lock_poisoned())?;
        Ok(blobs.get(locator).cloned())
    }
}

//! # Wrapped-Secret Store
//!
//! Private persistence for wrapped key material, keyed by archive id and
//! disjoint from ledger storage. Only the service tier holding the master
//! secret reads it.

use crate::envelope::WrappedKeyMaterial;
use crate::VaultError;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Storage port for wrapped key material.
pub trait WrappedSecretStore: Send + Sync {
    /// Persist material for an archive. Material is written once at
    /// registration and never updated.
    fn put(&self, archive_id: &str, material: WrappedKeyMaterial) -> Result<(), VaultError>;

    /// Fetch material for an archive, if any was persisted.
    fn get(&self, archive_id: &str) -> Result<Option<WrappedKeyMaterial>, VaultError>;
}

/// In-memory reference adapter.
#[derive(Default)]
pub struct InMemoryWrappedSecretStore {
    materials: RwLock<HashMap<String, WrappedKeyMaterial>>,
}

impl InMemoryWrappedSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> VaultError {
        VaultError::Storage("wrapped-secret store lock poisoned".to_string())
    }
}

impl WrappedSecretStore for InMemoryWrappedSecretStore {
    fn put(&self, archive_id: &str, material: WrappedKeyMaterial) -> Result<(), VaultError> {
        let mut materials = self.materials.write().map_err(|_| Self::lock_poisoned())?;
        materials.insert(archive_id.to_string(), material);
        debug!(archive_id, "Wrapped key material persisted");
        Ok(())
    }

    fn get(&self, archive_id: &str) -> Result<Option<WrappedKeyMaterial>, VaultError> {
        let materials = self.materials.read().map_err(|_| Self::lock_poisoned())?;
        Ok(materials.get(archive_id).cloned())
    }
}

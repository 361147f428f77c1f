//! # Master Secret
//!
//! The process-wide wrapping key. Loaded once at startup from base64
//! configuration; absent or wrong-length material is a fatal startup error,
//! not something to limp past.

use crate::VaultError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use zeroize::Zeroize;

/// Required master secret length in bytes (AES-256).
pub const MASTER_SECRET_LEN: usize = 32;

/// Process-wide wrapping key (256-bit). Zeroized on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct MasterSecret([u8; MASTER_SECRET_LEN]);

impl MasterSecret {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; MASTER_SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Decode from the base64 form used in configuration.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::MasterSecretEncoding` on malformed base64 and
    /// `VaultError::InvalidMasterSecret` if the decoded length is not
    /// exactly [`MASTER_SECRET_LEN`].
    pub fn from_base64(encoded: &str) -> Result<Self, VaultError> {
        let mut decoded = BASE64
            .decode(encoded.trim())
            .map_err(|e| VaultError::MasterSecretEncoding(e.to_string()))?;
        if decoded.len() != MASTER_SECRET_LEN {
            decoded.zeroize();
            return Err(VaultError::InvalidMasterSecret {
                expected: MASTER_SECRET_LEN,
                actual: decoded.len(),
            });
        }
        let mut bytes = [0u8; MASTER_SECRET_LEN];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(bytes))
    }

    /// Generate a random master secret (tests and provisioning tooling).
    pub fn generate() -> Self {
        let mut bytes = [0u8; MASTER_SECRET_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; MASTER_SECRET_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("MasterSecret(..)")
    }
}

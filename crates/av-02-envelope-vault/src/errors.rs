//! Vault error types.

use thiserror::Error;

/// Cryptographic and custody errors.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Master secret has the wrong length after decoding
    #[error("Invalid master secret length: expected {expected} bytes, got {actual}")]
    InvalidMasterSecret {
        /// Required length in bytes
        expected: usize,
        /// Decoded length in bytes
        actual: usize,
    },

    /// Master secret is not valid base64
    #[error("Master secret is not valid base64: {0}")]
    MasterSecretEncoding(String),

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Authenticated decryption failed: tampering or wrong master secret.
    /// Always fatal for the read in progress.
    #[error("Authenticated decryption failed")]
    DecryptionFailed,

    /// A wrapped component is not valid base64
    #[error("Invalid wrapped component encoding: {0}")]
    ComponentEncoding(String),

    /// A decoded component has an impossible length
    #[error("Invalid {component} length: expected {expected} bytes, got {actual}")]
    ComponentLength {
        /// Which component (key, iv, tag)
        component: &'static str,
        /// Required length in bytes
        expected: usize,
        /// Decoded length in bytes
        actual: usize,
    },

    /// Wrapped-secret store failure
    #[error("Wrapped-secret store error: {0}")]
    Storage(String),

    /// No wrapped material persisted for the archive
    #[error("No wrapped key material for archive '{archive_id}'")]
    MaterialNotFound {
        /// The archive whose material is missing
        archive_id: String,
    },
}

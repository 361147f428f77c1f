//! # Document Sealing
//!
//! Encrypts document bytes under a fresh per-document key before they leave
//! the service tier for the blob store. The sealed form keeps the GCM tag
//! out of the stored blob so that possession of the blob alone proves
//! nothing; key, IV, and tag travel through the vault's wrapping path.

use crate::VaultError;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// Per-document key length in bytes (AES-256).
pub const DOC_KEY_LEN: usize = 32;

/// Per-document IV length in bytes (96-bit GCM nonce).
pub const DOC_IV_LEN: usize = 12;

/// GCM authentication tag length in bytes.
pub const DOC_TAG_LEN: usize = 16;

/// One document's complete decryption material. Zeroized on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct DocumentKeyMaterial {
    key: [u8; DOC_KEY_LEN],
    iv: [u8; DOC_IV_LEN],
    tag: [u8; DOC_TAG_LEN],
}

impl DocumentKeyMaterial {
    pub(crate) fn from_parts(
        key: [u8; DOC_KEY_LEN],
        iv: [u8; DOC_IV_LEN],
        tag: [u8; DOC_TAG_LEN],
    ) -> Self {
        Self { key, iv, tag }
    }

    /// Fresh random key and IV with a zero tag placeholder (tests).
    #[cfg(test)]
    pub(crate) fn generate() -> Self {
        let mut key = [0u8; DOC_KEY_LEN];
        let mut iv = [0u8; DOC_IV_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut key);
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut iv);
        Self {
            key,
            iv,
            tag: [0u8; DOC_TAG_LEN],
        }
    }

    pub fn key(&self) -> &[u8; DOC_KEY_LEN] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; DOC_IV_LEN] {
        &self.iv
    }

    pub fn tag(&self) -> &[u8; DOC_TAG_LEN] {
        &self.tag
    }
}

impl std::fmt::Debug for DocumentKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DocumentKeyMaterial(..)")
    }
}

/// Result of sealing a document: what goes to the blob store, what goes to
/// the ledger, and what goes through the vault.
pub struct SealedDocument {
    /// Encrypted bytes, authentication tag excluded. Stored in the blob store.
    pub cipher_text: Vec<u8>,
    /// Hex SHA-256 of `cipher_text`. Recorded on the ledger for integrity
    /// cross-checks at fetch time.
    pub cipher_hash: String,
    /// Key, IV, and tag for this document. Wrapped and persisted privately.
    pub key_material: DocumentKeyMaterial,
}

/// Seal document bytes under a fresh random key and IV.
///
/// # Errors
///
/// Returns `VaultError::EncryptionFailed` if encryption fails.
pub fn seal(plaintext: &[u8]) -> Result<SealedDocument, VaultError> {
    let mut key = [0u8; DOC_KEY_LEN];
    let mut iv = [0u8; DOC_IV_LEN];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut key);
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut iv);

    let cipher = Aes256Gcm::new((&key).into());
    let mut sealed = cipher
        .encrypt(Nonce::from_slice(&iv), Payload::from(plaintext))
        .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

    let tag_bytes = sealed.split_off(sealed.len() - DOC_TAG_LEN);
    let mut tag = [0u8; DOC_TAG_LEN];
    tag.copy_from_slice(&tag_bytes);

    let cipher_hash = hex::encode(Sha256::digest(&sealed));

    Ok(SealedDocument {
        cipher_text: sealed,
        cipher_hash,
        key_material: DocumentKeyMaterial { key, iv, tag },
    })
}

/// Open a sealed document, verifying its authentication tag.
///
/// # Errors
///
/// Returns `VaultError::DecryptionFailed` if the ciphertext or tag was
/// tampered with, or the key material does not match.
pub fn open(cipher_text: &[u8], material: &DocumentKeyMaterial) -> Result<Vec<u8>, VaultError> {
    let cipher = Aes256Gcm::new(material.key().into());

    let mut sealed = cipher_text.to_vec();
    sealed.extend_from_slice(material.tag());

    cipher
        .decrypt(Nonce::from_slice(material.iv()), Payload::from(sealed.as_slice()))
        .map_err(|_| VaultError::DecryptionFailed)
}

/// Hex SHA-256 of stored ciphertext, for comparison against the ledger's
/// recorded hash before any decryption is attempted.
#[must_use]
pub fn cipher_hash(cipher_text: &[u8]) -> String {
    hex::encode(Sha256::digest(cipher_text))
}

//! # Secret Wrapping
//!
//! `wrap` / `unwrap` of small secrets under the master secret. Each wrapped
//! value carries its own random nonce and authentication tag, so the three
//! components of a document's key material are independently verifiable.

use crate::document::{DocumentKeyMaterial, DOC_IV_LEN, DOC_KEY_LEN, DOC_TAG_LEN};
use crate::master::MasterSecret;
use crate::VaultError;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

/// GCM nonce length in bytes (96-bit).
const WRAP_NONCE_LEN: usize = 12;

/// GCM authentication tag length in bytes.
const WRAP_TAG_LEN: usize = 16;

/// One secret wrapped under the master secret, as transportable strings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WrappedSecret {
    /// Base64 ciphertext, tag excluded
    pub cipher_text: String,
    /// Base64 nonce used for this wrap
    pub iv: String,
    /// Base64 authentication tag
    pub auth_tag: String,
}

/// A document's full key material, each component wrapped separately.
/// This is the shape persisted in the private store, keyed by archive id.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WrappedKeyMaterial {
    pub key: WrappedSecret,
    pub iv: WrappedSecret,
    pub tag: WrappedSecret,
}

/// Stateless wrap/unwrap engine over a fixed master secret.
#[derive(Clone)]
pub struct EnvelopeKeyVault {
    master: MasterSecret,
}

impl EnvelopeKeyVault {
    pub fn new(master: MasterSecret) -> Self {
        Self { master }
    }

    /// Wrap a small secret under the master secret.
    ///
    /// Generates a fresh random nonce per call; wrapping the same bytes
    /// twice yields different ciphertexts.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::EncryptionFailed` if encryption fails.
    pub fn wrap(&self, secret: &[u8]) -> Result<WrappedSecret, VaultError> {
        let cipher = Aes256Gcm::new(self.master.as_bytes().into());

        let mut nonce_bytes = [0u8; WRAP_NONCE_LEN];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut sealed = cipher
            .encrypt(nonce, Payload::from(secret))
            .map_err(|e| VaultError::EncryptionFailed(e.to_string()))?;

        // AEAD output is ciphertext || tag; store the tag separately.
        let tag = sealed.split_off(sealed.len() - WRAP_TAG_LEN);

        Ok(WrappedSecret {
            cipher_text: BASE64.encode(&sealed),
            iv: BASE64.encode(nonce_bytes),
            auth_tag: BASE64.encode(&tag),
        })
    }

    /// Unwrap a secret, verifying its authentication tag.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::DecryptionFailed` on any authentication failure
    /// (tampered component or wrong master secret). Never returns
    /// unauthenticated plaintext.
    pub fn unwrap(&self, wrapped: &WrappedSecret) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        let cipher_text = decode_component(&wrapped.cipher_text)?;
        let nonce_bytes = decode_component(&wrapped.iv)?;
        let tag = decode_component(&wrapped.auth_tag)?;

        if nonce_bytes.len() != WRAP_NONCE_LEN {
            return Err(VaultError::ComponentLength {
                component: "iv",
                expected: WRAP_NONCE_LEN,
                actual: nonce_bytes.len(),
            });
        }
        if tag.len() != WRAP_TAG_LEN {
            return Err(VaultError::ComponentLength {
                component: "tag",
                expected: WRAP_TAG_LEN,
                actual: tag.len(),
            });
        }

        let cipher = Aes256Gcm::new(self.master.as_bytes().into());
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut sealed = cipher_text;
        sealed.extend_from_slice(&tag);

        let plaintext = cipher
            .decrypt(nonce, Payload::from(sealed.as_slice()))
            .map_err(|_| VaultError::DecryptionFailed)?;

        Ok(Zeroizing::new(plaintext))
    }

    /// Wrap all three components of a document's key material.
    pub fn wrap_key_material(
        &self,
        material: &DocumentKeyMaterial,
    ) -> Result<WrappedKeyMaterial, VaultError> {
        Ok(WrappedKeyMaterial {
            key: self.wrap(material.key())?,
            iv: self.wrap(material.iv())?,
            tag: self.wrap(material.tag())?,
        })
    }

    /// Unwrap persisted key material back into its fixed-size components.
    pub fn unwrap_key_material(
        &self,
        wrapped: &WrappedKeyMaterial,
    ) -> Result<DocumentKeyMaterial, VaultError> {
        let key = self.unwrap(&wrapped.key)?;
        let iv = self.unwrap(&wrapped.iv)?;
        let tag = self.unwrap(&wrapped.tag)?;

        Ok(DocumentKeyMaterial::from_parts(
            sized::<DOC_KEY_LEN>("key", &key)?,
            sized::<DOC_IV_LEN>("iv", &iv)?,
            sized::<DOC_TAG_LEN>("tag", &tag)?,
        ))
    }
}

fn decode_component(encoded: &str) -> Result<Vec<u8>, VaultError> {
    BASE64
        .decode(encoded)
        .map_err(|e| VaultError::ComponentEncoding(e.to_string()))
}

fn sized<const N: usize>(component: &'static str, bytes: &[u8]) -> Result<[u8; N], VaultError> {
    if bytes.len() != N {
        return Err(VaultError::ComponentLength {
            component,
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

impl Drop for WrappedKeyMaterial {
    fn drop(&mut self) {
        // Wrapped forms are not secret, but scrub anyway to keep the whole
        // custody path free of lingering buffers.
        self.key.cipher_text.zeroize();
        self.iv.cipher_text.zeroize();
        self.tag.cipher_text.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault() -> EnvelopeKeyVault {
        EnvelopeKeyVault::new(MasterSecret::generate())
    }

    #[test]
    fn test_wrap_unwrap_roundtrip() {
        let vault = vault();
        for secret in [b"".as_slice(), b"k", &[7u8; 32], &[0u8; 1024]] {
            let wrapped = vault.wrap(secret).unwrap();
            let unwrapped = vault.unwrap(&wrapped).unwrap();
            assert_eq!(unwrapped.as_slice(), secret);
        }
    }

    #[test]
    fn test_wrap_is_randomized() {
        let vault = vault();
        let a = vault.wrap(b"same bytes").unwrap();
        let b = vault.wrap(b"same bytes").unwrap();
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.cipher_text, b.cipher_text);
    }

    #[test]
    fn test_corrupted_tag_fails() {
        let vault = vault();
        let mut wrapped = vault.wrap(b"document key").unwrap();

        let mut tag = BASE64.decode(&wrapped.auth_tag).unwrap();
        tag[0] ^= 0xFF;
        wrapped.auth_tag = BASE64.encode(&tag);

        let err = vault.unwrap(&wrapped).unwrap_err();
        assert!(matches!(err, VaultError::DecryptionFailed));
    }

    #[test]
    fn test_corrupted_ciphertext_fails() {
        let vault = vault();
        let mut wrapped = vault.wrap(b"document key").unwrap();

        let mut ct = BASE64.decode(&wrapped.cipher_text).unwrap();
        ct[0] ^= 0x01;
        wrapped.cipher_text = BASE64.encode(&ct);

        assert!(vault.unwrap(&wrapped).is_err());
    }

    #[test]
    fn test_wrong_master_secret_fails() {
        let wrapped = vault().wrap(b"document key").unwrap();
        let other = vault();
        let err = other.unwrap(&wrapped).unwrap_err();
        assert!(matches!(err, VaultError::DecryptionFailed));
    }

    #[test]
    fn test_key_material_roundtrip() {
        let vault = vault();
        let material = DocumentKeyMaterial::generate();

        let wrapped = vault.wrap_key_material(&material).unwrap();
        let unwrapped = vault.unwrap_key_material(&wrapped).unwrap();

        assert_eq!(unwrapped.key(), material.key());
        assert_eq!(unwrapped.iv(), material.iv());
        assert_eq!(unwrapped.tag(), material.tag());
    }

    #[test]
    fn test_wrapped_material_serde_roundtrip() {
        let vault = vault();
        let wrapped = vault.wrap_key_material(&DocumentKeyMaterial::generate()).unwrap();

        let json = serde_json::to_string(&wrapped).unwrap();
        assert!(json.contains("cipherText"));
        assert!(json.contains("authTag"));
        let back: WrappedKeyMaterial = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wrapped);
    }
}

//! # Envelope-Key Vault
//!
//! Custody layer for each document's symmetric encryption material.
//!
//! Documents are sealed with a fresh per-document AES-256-GCM key; that key
//! (plus IV and authentication tag) is then wrapped under a process-wide
//! master secret before it is persisted. The ledger replicates archive
//! metadata to every peer, so document-decryption material must never touch
//! it — the wrapped triples live in a private store readable only by the
//! service tier holding the master secret.
//!
//! ## Security Properties
//!
//! - **AES-256-GCM** with a 96-bit random nonce for both sealing and wrapping
//! - Authenticated decryption: tampering or a wrong master secret raises
//!   [`VaultError`], never returns garbage
//! - Key material is zeroized on drop
//!
//! The vault is stateless apart from the fixed master secret and is safe to
//! share across threads.

pub mod document;
pub mod envelope;
pub mod errors;
pub mod master;
pub mod store;

pub use document::{DocumentKeyMaterial, SealedDocument};
pub use envelope::{EnvelopeKeyVault, WrappedKeyMaterial, WrappedSecret};
pub use errors::VaultError;
pub use master::MasterSecret;
pub use store::{InMemoryWrappedSecretStore, WrappedSecretStore};

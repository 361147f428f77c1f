//! # Shared Types Crate
//!
//! Cross-crate domain types for the archive ledger: roles and verified
//! caller claims, the archive/loan entities as stored on the ledger, and
//! the workflow error taxonomy.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a crate boundary
//!   lives here.
//! - **Claims In, Never Looked Up**: identity is passed explicitly as
//!   [`CallerClaims`]; no ambient or global identity exists anywhere in
//!   the workspace.

pub mod entities;
pub mod errors;
pub mod roles;

pub use entities::*;
pub use errors::WorkflowError;
pub use roles::{CallerClaims, Role, UnknownRole};

//! # Archive-Vault Test Suite
//!
//! Unified test crate for cross-subsystem behavior:
//!
//! ```text
//! tests/src/
//! └── integration/      # End-to-end workflow, custody, and scan flows
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p av-tests
//! cargo test -p av-tests integration::
//! ```
//!
//! Per-crate unit tests live next to the code they cover; this crate only
//! holds scenarios that need several subsystems wired together.

pub mod integration;

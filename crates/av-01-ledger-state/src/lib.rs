//! # av-01-ledger-state
//!
//! The authoritative archive workflow state machine.
//!
//! ## Role in System
//!
//! - **Single Source of Truth**: current state and full history of every
//!   archive record live in the [`VersionedStore`] behind this crate.
//! - **Protocol Enforcement**: every transition (register → submit →
//!   approve/reject → borrow/extend/return) is validated against role,
//!   ownership, and current status before anything is committed.
//! - **Event Emission**: each successful mutation returns exactly one
//!   [`shared_bus::ArchiveEvent`] for the caller to publish.
//!
//! ## Atomicity
//!
//! Operations are all-or-nothing: every check runs against the version read
//! at transaction start, and the commit is an optimistic compare-and-swap on
//! that version. A losing concurrent writer gets
//! `WorkflowError::CommitConflict` and no partial write survives.
//!
//! ## Time
//!
//! Loan timestamps come from the transaction time minted by the store when
//! the transaction begins, never from a wall clock read inside an operation,
//! so every replica computing a due date agrees bit-for-bit.

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{FixedTimeSource, InMemoryLedger, SystemTimeSource};
pub use domain::{authorize, BorrowRequest, LedgerStateMachine, RegisterRequest};
pub use ports::{
    CommitReceipt, HistoryEntry, LedgerTx, StoreError, TimeSource, VersionedStore, VersionedValue,
};

//! Adapters: the in-memory ledger and time sources.

pub mod memory_ledger;
pub mod time;

pub use memory_ledger::InMemoryLedger;
pub use time::{FixedTimeSource, SystemTimeSource};

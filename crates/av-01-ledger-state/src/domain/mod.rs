//! Domain logic: authorization rules and the state machine itself.

pub mod authorize;
pub mod machine;
pub mod requests;

pub use machine::LedgerStateMachine;
pub use requests::{BorrowRequest, RegisterRequest};

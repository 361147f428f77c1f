//! # Shared Bus - Event Bus for Workflow Notifications
//!
//! Carries one [`ArchiveEvent`] per successful ledger mutation from the
//! service tier to whatever collaborators care (notification dispatchers,
//! read-model rebuilders, test probes).
//!
//! ## Delivery Contract
//!
//! - Fire-and-forget: no acknowledgment, no retry, no persistence.
//! - Publishing with zero subscribers succeeds and returns 0.
//! - Slow subscribers may lag and lose events (bounded channel).

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{ArchiveEvent, EventFilter, EventTopic, LoanPayload, StatusPayload};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

//! # Archive Workflow Events
//!
//! One event per successful ledger mutation. The state machine returns the
//! event alongside the updated record; the service tier publishes it on the
//! bus fire-and-forget. Zero subscribers is not an error.

use serde::{Deserialize, Serialize};
use shared_types::entities::{ArchiveStatus, LoanRecord};

/// Payload for status-changing transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub archive_id: String,
    pub status: ArchiveStatus,
}

/// Payload for loan-changing transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPayload {
    pub archive_id: String,
    pub loan: LoanRecord,
}

/// All events emitted by the archive workflow.
///
/// Event names on the wire match the originating operation:
/// `Archive{Registered,Submitted,Approved,Rejected,Borrowed}` and
/// `Loan{Extended,Returned}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveEvent {
    /// A new archive was registered (status Draft).
    ArchiveRegistered(StatusPayload),
    /// A draft was submitted for approval (status Pending).
    ArchiveSubmitted(StatusPayload),
    /// A pending archive was approved.
    ArchiveApproved(StatusPayload),
    /// A pending archive was rejected.
    ArchiveRejected(StatusPayload),
    /// An approved archive was lent out.
    ArchiveBorrowed(LoanPayload),
    /// The active loan's due date was pushed out by one period.
    LoanExtended(LoanPayload),
    /// The active loan was returned.
    LoanReturned(LoanPayload),
}

impl ArchiveEvent {
    /// Wire name of this event, as consumed by notification collaborators.
    pub fn name(&self) -> &'static str {
        match self {
            ArchiveEvent::ArchiveRegistered(_) => "ArchiveRegistered",
            ArchiveEvent::ArchiveSubmitted(_) => "ArchiveSubmitted",
            ArchiveEvent::ArchiveApproved(_) => "ArchiveApproved",
            ArchiveEvent::ArchiveRejected(_) => "ArchiveRejected",
            ArchiveEvent::ArchiveBorrowed(_) => "ArchiveBorrowed",
            ArchiveEvent::LoanExtended(_) => "LoanExtended",
            ArchiveEvent::LoanReturned(_) => "LoanReturned",
        }
    }

    /// Archive id this event concerns.
    pub fn archive_id(&self) -> &str {
        match self {
            ArchiveEvent::ArchiveRegistered(p)
            | ArchiveEvent::ArchiveSubmitted(p)
            | ArchiveEvent::ArchiveApproved(p)
            | ArchiveEvent::ArchiveRejected(p) => &p.archive_id,
            ArchiveEvent::ArchiveBorrowed(p)
            | ArchiveEvent::LoanExtended(p)
            | ArchiveEvent::LoanReturned(p) => &p.archive_id,
        }
    }

    /// Topic this event belongs to.
    pub fn topic(&self) -> EventTopic {
        match self {
            ArchiveEvent::ArchiveRegistered(_)
            | ArchiveEvent::ArchiveSubmitted(_)
            | ArchiveEvent::ArchiveApproved(_)
            | ArchiveEvent::ArchiveRejected(_) => EventTopic::Workflow,
            ArchiveEvent::ArchiveBorrowed(_)
            | ArchiveEvent::LoanExtended(_)
            | ArchiveEvent::LoanReturned(_) => EventTopic::Loan,
        }
    }
}

/// Coarse event categories for subscription filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventTopic {
    /// Registration/approval lifecycle events.
    Workflow,
    /// Borrow/extend/return events.
    Loan,
}

/// Filter describing which events a subscriber wants.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// Topics to receive. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Receive every event.
    #[must_use]
    pub fn all() -> Self {
        Self { topics: Vec::new() }
    }

    /// Receive only the listed topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Whether an event passes this filter.
    pub fn matches(&self, event: &ArchiveEvent) -> bool {
        self.topics.is_empty() || self.topics.contains(&event.topic())
    }
}

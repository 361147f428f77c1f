use shared_types::entities::Timestamp;

/// Clock abstraction for transaction timestamps.
///
/// The store consults this once per transaction; operations never read a
/// clock themselves.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

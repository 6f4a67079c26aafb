use std::fmt;

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    LockPoisoned(&'static str),
    /// A concurrent write raced this one on the same business key. The
    /// caller should re-read the current version and retry.
    ConcurrentWrite {
        business_key: String,
        expected: u32,
        actual: u32,
    },
    /// A supersede targeted a key with no open version to close.
    NoCurrentVersion(String),
    /// An outbox status transition referenced an event id that does not exist.
    UnknownEvent(Uuid),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::LockPoisoned(operation) => {
                write!(f, "store lock poisoned during {}", operation)
            }
            StoreError::ConcurrentWrite {
                business_key,
                expected,
                actual,
            } => write!(
                f,
                "concurrent write detected for {} (expected version {}, got {})",
                business_key, expected, actual
            ),
            StoreError::NoCurrentVersion(business_key) => {
                write!(f, "no open version to supersede for {}", business_key)
            }
            StoreError::UnknownEvent(id) => write!(f, "unknown outbox event {}", id),
        }
    }
}

impl std::error::Error for StoreError {}

// Central Error Type for the Queue

use thiserror::Error;

/// Queue-level error type.
///
/// Every operation surfaces one of these; callers are not required to tell
/// the kinds apart. The connection / operation split exists for the storage
/// layer's repair logic, which reconnects only when the link itself died.
#[derive(Error, Debug)]
pub enum QueueError {
    /// The store link is unusable. The next operation repairs it lazily;
    /// the failed operation itself is never re-attempted internally.
    #[error("connection error: {0}")]
    Connection(String),

    /// The link is healthy but the store rejected this operation
    /// (constraint violation, malformed statement, busy database).
    #[error("operation rejected: {0}")]
    Operation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl QueueError {
    /// True when the link itself failed, as opposed to a rejected statement.
    pub fn is_connection(&self) -> bool {
        matches!(self, QueueError::Connection(_))
    }
}

/// Result type alias using QueueError
pub type Result<T> = std::result::Result<T, QueueError>;

// Note: sqlx::Error conversion is handled in the storage adapter crate
// (orphan rules prevent a From<sqlx::Error> impl here).

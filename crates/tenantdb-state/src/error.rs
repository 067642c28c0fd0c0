//! Error types for the tenantdb state store.

use thiserror::Error;

/// Result type alias for state store operations.
pub type StateResult<T> = Result<T, StateError>;

/// Errors that can occur during state store operations.
///
/// "Not found" is never an error here: lookups return `Option`.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    /// The key is already present; the uniqueness constraint rejected the insert.
    #[error("record already stored: {0}")]
    Duplicate(String),

    #[error("failed to store record {0}")]
    Store(String),

    #[error("failed to remove instance {0}")]
    RemoveInstance(String),

    #[error("failed to remove binding {0}")]
    RemoveBinding(String),
}

impl StateError {
    /// Whether the backend itself failed (unreachable, corrupt, aborted).
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            StateError::Open(_)
                | StateError::Transaction(_)
                | StateError::Table(_)
                | StateError::Read(_)
                | StateError::Write(_)
        )
    }
}

//! Storage error type.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors surfaced by storage providers.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A uniqueness constraint was violated.
    #[error("already exists: {0}")]
    Duplicate(String),

    /// The operation is not allowed in the row's current state, e.g.
    /// deleting the active signing keypair.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The backend itself failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = StorageError::InvalidState("keypair is active".to_string());
        assert_eq!(err.to_string(), "invalid state: keypair is active");
    }
}

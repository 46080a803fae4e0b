//! Storage error types

use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Errors from the primary entity and group store
#[derive(Error, Debug)]
pub enum StorageError {
    /// No entity of that type at that path
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Create of a type and path that is already registered
    #[error("Duplicate entity: {0}")]
    DuplicateEntity(String),

    /// Record rejected by domain validation before it reached the store
    #[error("Invalid entity: {0}")]
    Invalid(String),

    /// A poisoned in-memory lock
    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema version on disk that this build cannot migrate
    #[error("Migration error: {0}")]
    Migration(String),

    #[cfg(feature = "redb")]
    #[error("ReDB error: {0}")]
    Redb(#[from] ::redb::Error),

    #[cfg(feature = "redb")]
    #[error("ReDB database error: {0}")]
    RedbDatabase(#[from] ::redb::DatabaseError),

    #[cfg(feature = "redb")]
    #[error("ReDB table error: {0}")]
    RedbTable(#[from] ::redb::TableError),

    #[cfg(feature = "redb")]
    #[error("ReDB storage error: {0}")]
    RedbStorage(#[from] ::redb::StorageError),

    #[cfg(feature = "redb")]
    #[error("ReDB commit error: {0}")]
    RedbCommit(#[from] ::redb::CommitError),

    #[cfg(feature = "redb")]
    #[error("ReDB transaction error: {0}")]
    RedbTransaction(#[from] ::redb::TransactionError),
}

impl From<switchboard_core::Error> for StorageError {
    fn from(err: switchboard_core::Error) -> Self {
        Self::Invalid(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchboard_core::normalize_path;

    #[test]
    fn test_validation_errors_become_invalid() {
        let err = normalize_path("/has space").unwrap_err();
        let storage: StorageError = err.into();
        assert!(matches!(storage, StorageError::Invalid(_)));
    }

    #[test]
    fn test_lock_error_display() {
        let err = StorageError::Lock("entities poisoned".to_string());
        assert_eq!(err.to_string(), "Lock error: entities poisoned");
    }
}

//! Search error types

use thiserror::Error;

/// Result type alias for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Search-specific error types
#[derive(Error, Debug)]
pub enum SearchError {
    /// Missing or invalid backend or embedding settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Embedding provider transport, auth or response failure
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Backend write failure
    #[error("Indexing error: {0}")]
    Indexing(String),

    /// Backend query failure
    #[error("Query error: {0}")]
    Query(String),

    #[error("Storage error: {0}")]
    Storage(#[from] switchboard_storage::StorageError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ReDB error: {0}")]
    Redb(#[from] redb::Error),

    #[error("ReDB database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("ReDB table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("ReDB storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("ReDB commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("ReDB transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<switchboard_core::Error> for SearchError {
    fn from(err: switchboard_core::Error) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

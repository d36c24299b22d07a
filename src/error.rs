//! Error types for reqdocs-storage

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    /// Referenced record or scope does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Empty or malformed scope key handed to the allocator
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// Stored version string does not parse as `MM.mm`
    #[error("Malformed version: {0:?}")]
    MalformedVersion(String),

    /// Stored version is at the largest representable major and minor
    #[error("Version cannot advance past {0}")]
    VersionExhausted(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transient infrastructure failure (pool exhausted, busy database, ...)
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Whether the failure may succeed on retry.
    ///
    /// Only read paths (`preview`, lookups) should act on this. A failed
    /// `allocate` may or may not have committed its increment, so callers
    /// must not blindly resubmit it.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Database(_) | StorageError::Io(_))
    }
}

impl From<diesel::result::Error> for StorageError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => StorageError::NotFound("record not found".into()),
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            ) => StorageError::Conflict(info.message().to_string()),
            other => StorageError::Database(other.to_string()),
        }
    }
}

impl From<diesel::r2d2::PoolError> for StorageError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        StorageError::Database(format!("Failed to get connection: {}", e))
    }
}

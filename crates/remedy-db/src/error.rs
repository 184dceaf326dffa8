//! # Persistence Errors
//!
//! What can go wrong between the repositories and the SQLite file.
//!
//! ## Where Each Layer's Errors End Up
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sqlx::Error / serde_json::Error                                       │
//! │       │  categorized here                                              │
//! │       ▼                                                                 │
//! │  DbError ──► ServiceError (service.rs) ──► terminal frontend           │
//! │                                                                         │
//! │  Storage failures never masquerade as business rejections: a denial    │
//! │  names a rule, a DbError names the store.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Result type for repository and pool operations.
pub type DbResult<T> = Result<T, DbError>;

/// Failures of the record store.
#[derive(Debug, Error)]
pub enum DbError {
    /// No record under the requested key.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A record that must be unique already exists; in this store that
    /// means opening a shift while the open-shift pointer is set.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A stored payload no longer deserializes, or a dangling pointer was
    /// found. Schema drift between versions and hand-edited database files
    /// are the usual suspects.
    #[error("Corrupted record: {0}")]
    Corrupted(String),

    /// The pool could not be opened or has gone away (missing file that
    /// cannot be created, permissions, full disk).
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A migration did not apply cleanly.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A statement failed at execution time.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A multi-record commit could not complete; nothing was written.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Every pooled connection was busy past the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Anything sqlx reports that fits none of the above.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Shorthand for [`DbError::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Shorthand for [`DbError::UniqueViolation`].
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => DbError::QueryFailed(db_err.message().to_string()),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// A payload that fails to (de)serialize is a corrupted record as far as
/// the store is concerned.
impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Corrupted(err.to_string())
    }
}

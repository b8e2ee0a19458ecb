//! Domain errors surfaced to callers.

use rusqlite::ErrorCode;
use thiserror::Error;

use crate::db::DbError;

/// Errors from lifecycle, ledger, projection and invoicing operations.
#[derive(Error, Debug)]
pub enum LabError {
    /// The requested status move is not allowed from the current status.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The viewer's role or row scope does not permit the operation.
    #[error("Insufficient authorization: {0}")]
    InsufficientAuthorization(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The store state changed underneath the caller; refetch and retry.
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(DbError),
}

pub type LabResult<T> = Result<T, LabError>;

impl From<DbError> for LabError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => LabError::NotFound(what),
            DbError::Constraint(msg) => LabError::ConstraintViolation(msg),
            DbError::Sqlite(rusqlite::Error::SqliteFailure(ref failure, ref msg))
                if matches!(
                    failure.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                ) =>
            {
                LabError::ConcurrencyConflict(msg.clone().unwrap_or_else(|| failure.to_string()))
            }
            DbError::Sqlite(rusqlite::Error::SqliteFailure(ref failure, ref msg))
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                LabError::ConstraintViolation(msg.clone().unwrap_or_else(|| failure.to_string()))
            }
            other => LabError::Database(other),
        }
    }
}

impl From<rusqlite::Error> for LabError {
    fn from(e: rusqlite::Error) -> Self {
        DbError::from(e).into()
    }
}

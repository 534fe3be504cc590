//! Ledger error types
//!
//! `StoreError` covers the persistence layer, `TransferError` is what the
//! engine reports to its callers.

use sqlx::error::ErrorKind;
use thiserror::Error;

/// PostgreSQL SQLSTATE codes worth retrying the whole operation for
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Errors from the ledger store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Row not found")]
    NotFound,

    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Foreign key constraint violated: {0}")]
    ForeignKeyViolation(String),

    #[error("Balance overflow on account {0}")]
    Overflow(i64),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    /// Whether the caller may retry the whole operation.
    ///
    /// The engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Database(sqlx::Error::Database(db_err)) => matches!(
                db_err.code().as_deref(),
                Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | LOCK_NOT_AVAILABLE)
            ),
            StoreError::Database(
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed,
            ) => true,
            _ => false,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    return StoreError::UniqueViolation(db_err.message().to_string());
                }
                ErrorKind::ForeignKeyViolation => {
                    return StoreError::ForeignKeyViolation(db_err.message().to_string());
                }
                _ => {}
            }
        }
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Database(other),
        }
    }
}

/// Transfer engine errors
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Account not found: {0}")]
    AccountNotFound(i64),

    #[error("Invalid transfer: {0}")]
    InvalidTransfer(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("Transfer cancelled before commit")]
    Cancelled,
}

impl TransferError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            TransferError::InvalidTransfer(_) => "INVALID_TRANSFER",
            TransferError::Persistence(_) => "PERSISTENCE_ERROR",
            TransferError::Cancelled => "CANCELLED",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::AccountNotFound(_) => 404,
            TransferError::InvalidTransfer(_) => 400,
            TransferError::Persistence(_) => 500,
            TransferError::Cancelled => 504,
        }
    }

    /// Whether retrying the whole transfer could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TransferError::Persistence(e) => e.is_retryable(),
            TransferError::Cancelled => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            TransferError::AccountNotFound(3).code(),
            "ACCOUNT_NOT_FOUND"
        );
        assert_eq!(
            TransferError::InvalidTransfer("x".into()).code(),
            "INVALID_TRANSFER"
        );
        assert_eq!(
            TransferError::Persistence(StoreError::NotFound).code(),
            "PERSISTENCE_ERROR"
        );
        assert_eq!(TransferError::Cancelled.code(), "CANCELLED");
    }

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::AccountNotFound(1).http_status(), 404);
        assert_eq!(
            TransferError::InvalidTransfer("x".into()).http_status(),
            400
        );
        assert_eq!(
            TransferError::Persistence(StoreError::Overflow(1)).http_status(),
            500
        );
        assert_eq!(TransferError::Cancelled.http_status(), 504);
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(!StoreError::NotFound.is_retryable());
        assert!(!StoreError::Overflow(1).is_retryable());
        assert!(!TransferError::AccountNotFound(1).is_retryable());
        assert!(TransferError::Cancelled.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = TransferError::AccountNotFound(42);
        assert_eq!(err.to_string(), "Account not found: 42");
        let err = TransferError::from(StoreError::Overflow(7));
        assert_eq!(
            err.to_string(),
            "Persistence error: Balance overflow on account 7"
        );
    }
}

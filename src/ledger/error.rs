//! Ledger Error Types
//!
//! One error type for the entity store, the transaction executor and the
//! transfer orchestrator. Database errors are classified by SQLSTATE so
//! constraint violations surface as their own variants.

use sqlx::error::ErrorKind;
use thiserror::Error;

use crate::context::ContextError;

/// Raised by `statement_timeout` / `lock_timeout`
const TIMEOUT_SQLSTATES: [&str; 2] = [
    "57014", // query_canceled
    "55P03", // lock_not_available
];

/// SQLSTATE codes a caller may retry the whole transfer on
const RETRYABLE_SQLSTATES: [&str; 3] = [
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available
];

#[derive(Error, Debug)]
pub enum LedgerError {
    // === Lookup ===
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    // === Constraint violations ===
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("Unique violation: {0}")]
    UniqueViolation(String),

    #[error("Check violation: {0}")]
    CheckViolation(String),

    // === Transaction boundary ===
    #[error("Failed to begin transaction: {0}")]
    Begin(#[source] sqlx::Error),

    #[error("Failed to commit transaction: {0}")]
    Commit(#[source] sqlx::Error),

    /// The unit of work failed and so did the rollback. Both are kept.
    #[error("tx err: {cause}, rb err: {rollback}")]
    Rollback {
        cause: Box<LedgerError>,
        #[source]
        rollback: sqlx::Error,
    },

    // === Context ===
    #[error("Transaction cancelled")]
    Cancelled,

    #[error("Transaction deadline exceeded")]
    DeadlineExceeded,

    // === Transfer validation ===
    #[error("Invalid transfer amount {0}: must be greater than zero")]
    InvalidAmount(i64),

    #[error(
        "Insufficient funds: account {account_id} would hold {balance} after a debit of {amount}"
    )]
    InsufficientFunds {
        account_id: i64,
        balance: i64,
        amount: i64,
    },

    #[error("Currency mismatch: cannot transfer {from} to {to}")]
    CurrencyMismatch { from: String, to: String },

    #[error("Invalid currency code: '{0}'")]
    InvalidCurrency(String),

    // === Everything else from the store ===
    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        LedgerError::NotFound { entity, id }
    }

    /// Stable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::NotFound { .. } => "NOT_FOUND",
            LedgerError::ForeignKeyViolation(_) => "FOREIGN_KEY_VIOLATION",
            LedgerError::UniqueViolation(_) => "UNIQUE_VIOLATION",
            LedgerError::CheckViolation(_) => "CHECK_VIOLATION",
            LedgerError::Begin(_) => "TX_BEGIN_FAILED",
            LedgerError::Commit(_) => "TX_COMMIT_FAILED",
            LedgerError::Rollback { .. } => "TX_ROLLBACK_FAILED",
            LedgerError::Cancelled => "CANCELLED",
            LedgerError::DeadlineExceeded => "DEADLINE_EXCEEDED",
            LedgerError::InvalidAmount(_) => "INVALID_AMOUNT",
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::CurrencyMismatch { .. } => "CURRENCY_MISMATCH",
            LedgerError::InvalidCurrency(_) => "INVALID_CURRENCY",
            LedgerError::Database(_) => "DATABASE_ERROR",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound { .. })
    }

    /// SQLSTATE of the underlying database error, if any
    pub fn sqlstate(&self) -> Option<String> {
        match self {
            LedgerError::Begin(e) | LedgerError::Commit(e) | LedgerError::Database(e) => e
                .as_database_error()
                .and_then(|db| db.code())
                .map(|code| code.into_owned()),
            LedgerError::Rollback { cause, .. } => cause.sqlstate(),
            _ => None,
        }
    }

    /// Statement aborted by a server-side timeout
    pub fn is_statement_timeout(&self) -> bool {
        self.sqlstate()
            .is_some_and(|code| TIMEOUT_SQLSTATES.contains(&code.as_str()))
    }

    /// Transient concurrency failures. Retrying the entire transfer is safe
    /// because nothing from the failed attempt was committed.
    pub fn is_retryable(&self) -> bool {
        self.sqlstate()
            .is_some_and(|code| RETRYABLE_SQLSTATES.contains(&code.as_str()))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let detail = match db_err.constraint() {
                Some(constraint) => format!("{} ({})", db_err.message(), constraint),
                None => db_err.message().to_string(),
            };
            match db_err.kind() {
                ErrorKind::ForeignKeyViolation => return LedgerError::ForeignKeyViolation(detail),
                ErrorKind::UniqueViolation => return LedgerError::UniqueViolation(detail),
                ErrorKind::CheckViolation => return LedgerError::CheckViolation(detail),
                _ => {}
            }
        }
        LedgerError::Database(err)
    }
}

impl From<ContextError> for LedgerError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Cancelled => LedgerError::Cancelled,
            ContextError::DeadlineExceeded => LedgerError::DeadlineExceeded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_error_keeps_both_messages() {
        let err = LedgerError::Rollback {
            cause: Box::new(LedgerError::not_found("account", 7)),
            rollback: sqlx::Error::PoolClosed,
        };
        let msg = err.to_string();
        assert!(msg.starts_with("tx err: account 7 not found, rb err: "));
        assert!(msg.contains(&sqlx::Error::PoolClosed.to_string()));
        assert_eq!(err.code(), "TX_ROLLBACK_FAILED");
    }

    #[test]
    fn test_context_errors_map_to_cancellation_variants() {
        assert!(matches!(
            LedgerError::from(ContextError::Cancelled),
            LedgerError::Cancelled
        ));
        assert!(matches!(
            LedgerError::from(ContextError::DeadlineExceeded),
            LedgerError::DeadlineExceeded
        ));
    }

    #[test]
    fn test_non_database_sqlx_errors_stay_generic() {
        let err = LedgerError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, LedgerError::Database(sqlx::Error::RowNotFound)));
        assert_eq!(err.sqlstate(), None);
        assert!(!err.is_retryable());
        assert!(!err.is_statement_timeout());
        assert!(!LedgerError::DeadlineExceeded.is_statement_timeout());
    }

    #[test]
    fn test_codes() {
        assert_eq!(LedgerError::InvalidAmount(0).code(), "INVALID_AMOUNT");
        assert_eq!(LedgerError::Cancelled.code(), "CANCELLED");
        assert_eq!(
            LedgerError::InsufficientFunds {
                account_id: 1,
                balance: -5,
                amount: 10
            }
            .code(),
            "INSUFFICIENT_FUNDS"
        );
        assert!(LedgerError::not_found("entry", 1).is_not_found());
        assert!(!LedgerError::DeadlineExceeded.is_not_found());
    }
}

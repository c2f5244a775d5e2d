//! Mapping of database failures onto [`StoreError`].

use sea_orm::{DbErr, RuntimeErr};
use sqlx::error::DatabaseError;
use tally_core::store::StoreError;

/// SQLSTATE for a unique index violation.
pub const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for an exclusion constraint violation.
pub const EXCLUSION_VIOLATION: &str = "23P01";
/// SQLSTATE for a serialization failure.
pub const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE for a detected deadlock.
pub const DEADLOCK_DETECTED: &str = "40P01";

/// Converts a `SeaORM` error into the storage error the engine understands.
///
/// Unique and exclusion violations carry the constraint name, which matches
/// the names the in-memory store reports. Lost connections, pool timeouts,
/// serialization failures and deadlocks are reported as `Unavailable` so
/// callers may retry them.
pub fn store_error(err: DbErr) -> StoreError {
    if let Some(db_err) = database_error(&err) {
        let code = db_err.code().unwrap_or_default();
        match code.as_ref() {
            UNIQUE_VIOLATION | EXCLUSION_VIOLATION => {
                let name = db_err.constraint().unwrap_or(db_err.message());
                return StoreError::UniqueViolation(name.to_string());
            }
            SERIALIZATION_FAILURE | DEADLOCK_DETECTED => {
                return StoreError::Unavailable(db_err.message().to_string());
            }
            _ => {}
        }
    }

    match &err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => StoreError::Unavailable(err.to_string()),
        DbErr::Exec(RuntimeErr::SqlxError(sqlx_err))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
            if is_transient(sqlx_err) =>
        {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Database(err.to_string()),
    }
}

fn database_error(err: &DbErr) -> Option<&dyn DatabaseError> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db_err)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db_err))) => {
            Some(db_err.as_ref())
        }
        _ => None,
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_unavailable() {
        let err = DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::PoolTimedOut));
        assert!(matches!(store_error(err), StoreError::Unavailable(_)));
    }

    #[test]
    fn test_connection_failure_is_unavailable() {
        let err = DbErr::Conn(RuntimeErr::Internal("connection refused".to_string()));
        assert!(matches!(store_error(err), StoreError::Unavailable(_)));
    }

    #[test]
    fn test_other_failures_are_database_errors() {
        let err = DbErr::RecordNotFound("accounts".to_string());
        assert!(matches!(store_error(err), StoreError::Database(msg) if msg.contains("accounts")));
    }
}

//! Translation of pool and Diesel failures into document store errors.

use tracing::debug;

use super::pool::PoolError;
use crate::domain::ports::DocumentStoreError;

/// Map pool failures to connection errors.
pub(crate) fn map_pool_error(error: PoolError) -> DocumentStoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            DocumentStoreError::connection(message)
        }
    }
}

/// Map Diesel failures, keeping driver detail out of client-facing text.
pub(crate) fn map_diesel_error(error: diesel::result::Error) -> DocumentStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            DocumentStoreError::duplicate(info.constraint_name().unwrap_or("documents_pkey"))
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            DocumentStoreError::connection("database connection error")
        }
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            DocumentStoreError::query("transaction serialisation failure")
        }
        DieselError::QueryBuilderError(_) => DocumentStoreError::query("database query error"),
        _ => DocumentStoreError::query("database error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn pool_failures_are_connection_errors() {
        let err = map_pool_error(PoolError::checkout("timed out"));
        assert_eq!(err, DocumentStoreError::connection("timed out"));
    }

    #[rstest]
    fn not_found_is_a_query_error() {
        let err = map_diesel_error(diesel::result::Error::NotFound);
        assert_eq!(err, DocumentStoreError::query("database error"));
    }

    #[rstest]
    fn rollbacks_do_not_leak_details() {
        let err = map_diesel_error(diesel::result::Error::RollbackTransaction);
        assert!(matches!(err, DocumentStoreError::Query { .. }));
    }
}

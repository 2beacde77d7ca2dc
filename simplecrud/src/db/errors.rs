use thiserror::Error;

/// SQLSTATE returned when the database aborts a transaction that must be retried.
/// CockroachDB reports every transaction retry error under this code.
pub const SERIALIZATION_FAILURE_CODE: &str = "40001";

/// Unified error type for database operations that application code can handle
#[derive(Error, Debug)]
pub enum DbError {
    /// Entity not found by the given identifier
    #[error("Entity not found")]
    NotFound,

    /// Unique constraint violation
    #[error("Unique constraint violation")]
    UniqueViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// Check constraint violation
    #[error("Check constraint violation")]
    CheckViolation {
        constraint: Option<String>,
        table: Option<String>,
        message: String,
    },

    /// The transaction was aborted by the database and can be retried
    #[error("Serialization failure: {message}")]
    SerializationFailure { message: String },

    /// Catch-all for non-recoverable errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DbError {
    /// Whether re-running the whole transaction may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::SerializationFailure { .. })
    }
}

/// Check a SQLSTATE code for a serialization failure
pub fn is_serialization_failure(code: Option<&str>) -> bool {
    code == Some(SERIALIZATION_FAILURE_CODE)
}

/// Convert from sqlx::Error using proper sqlx error categorization
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            sqlx::Error::Database(db_err) => {
                if is_serialization_failure(db_err.code().as_deref()) {
                    DbError::SerializationFailure {
                        message: db_err.message().to_string(),
                    }
                } else if db_err.is_unique_violation() {
                    DbError::UniqueViolation {
                        constraint: db_err.constraint().map(|s| s.to_string()),
                        table: db_err.table().map(|s| s.to_string()),
                        message: db_err.message().to_string(),
                    }
                } else if db_err.is_check_violation() {
                    DbError::CheckViolation {
                        constraint: db_err.constraint().map(|s| s.to_string()),
                        table: db_err.table().map(|s| s.to_string()),
                        message: db_err.message().to_string(),
                    }
                } else {
                    // All other database errors are non-recoverable - convert to anyhow
                    DbError::Other(anyhow::Error::from(err))
                }
            }
            // Connection, TLS, pool and protocol errors are non-recoverable here
            _ => DbError::Other(anyhow::Error::from(err)),
        }
    }
}

/// Type alias for database operation results
pub type Result<T> = std::result::Result<T, DbError>;

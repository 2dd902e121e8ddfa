//! Database error types and handling
//!
//! Provides custom error types for database operations with conversion from
//! sqlx errors.

use thiserror::Error;

/// Custom database error type
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Connection error
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Constraint violation (unique, check, etc.)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Data type mismatch or conversion error
    #[error("Data type error: {0}")]
    TypeError(String),

    /// Migration error
    #[error("Migration failed: {0}")]
    MigrationError(String),

    /// Pool error
    #[error("Connection pool error: {0}")]
    PoolError(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(String),
}

impl DatabaseError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }

    /// Check if this is a constraint violation
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, DatabaseError::ConstraintViolation(_))
    }
}

/// Result type for database operations
pub type DbResult<T> = std::result::Result<T, DatabaseError>;

/// Convert sqlx::Error to DatabaseError
impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => {
                DatabaseError::NotFound("No matching row found in database".to_string())
            }
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() || db_err.is_check_violation() {
                    DatabaseError::ConstraintViolation(db_err.message().to_string())
                } else {
                    DatabaseError::Other(db_err.message().to_string())
                }
            }
            sqlx::Error::ColumnNotFound(col) => {
                DatabaseError::TypeError(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DatabaseError::TypeError(format!("Error decoding column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => {
                DatabaseError::TypeError(format!("Decode error: {}", source))
            }
            sqlx::Error::Configuration(msg) => {
                DatabaseError::ConnectionError(format!("Configuration error: {}", msg))
            }
            sqlx::Error::Io(err) => DatabaseError::ConnectionError(format!("IO error: {}", err)),
            sqlx::Error::PoolTimedOut => {
                DatabaseError::PoolError("Connection pool timed out".to_string())
            }
            sqlx::Error::PoolClosed => {
                DatabaseError::PoolError("Connection pool is closed".to_string())
            }
            sqlx::Error::Migrate(err) => {
                DatabaseError::MigrationError(format!("Migration error: {}", err))
            }
            err => DatabaseError::Other(format!("Database error: {}", err)),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationError(err.to_string())
    }
}

use app_error::AppError;
use thiserror::Error;

/// Errors raised by repository sessions.
#[derive(Debug, Error)]
pub enum DataError {
    /// The row an operation targets does not exist (any more).
    #[error("Not found: {0}")]
    NotFound(String),
    /// A unique or immutability rule of the table was violated.
    #[error("Constraint violation: {0}")]
    Constraint(String),
    /// The session was used in a way its transaction state does not allow.
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),
    #[error("Cannot encode argument: {0}")]
    Encode(String),
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl DataError {
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, DataError::InvalidState(_))
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".into()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                DataError::Constraint(db.message().to_owned())
            }
            _ => DataError::Database(err),
        }
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::InvalidState(msg) => AppError::invalid_state(msg),
            other => AppError::database(other.to_string()),
        }
    }
}

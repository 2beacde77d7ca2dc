use crate::db::errors::DbError;
use crate::types::AccountId;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// The source account cannot cover the transfer
    #[error("insufficient funds in {account}: have {available}, need {requested}")]
    InsufficientFunds {
        account: AccountId,
        available: i64,
        requested: i64,
    },

    /// Transfer arguments rejected before touching the database
    #[error("invalid transfer: {message}")]
    InvalidTransfer { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Transaction kept hitting serialization failures
    #[error("transaction did not succeed after {max_retries} retries")]
    RetriesExhausted { max_retries: u32 },

    /// Configuration is inconsistent or incomplete
    #[error("{message}")]
    InvalidConfig { message: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Whether the failed transaction is worth re-running
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Database(db_err) => db_err.is_retryable(),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Database(DbError::from(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Error types for the D1 dialect
//!
//! Every failure surfaces as a [`D1Error`]. Errors raised by the remote store keep
//! their message verbatim; operations D1 cannot perform at all are reported as
//! [`D1Error::Unsupported`] so callers can tell them apart from transient failures.

use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind};
use thiserror::Error;

/// Operations that D1 does not provide through its prepare/bind/execute surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedOperation {
    /// Opening a transaction
    BeginTransaction,
    /// Committing a transaction
    CommitTransaction,
    /// Rolling back a transaction
    RollbackTransaction,
    /// Incremental delivery of result rows
    StreamQuery,
}

impl UnsupportedOperation {
    /// The fixed message reported for this operation
    pub fn message(&self) -> &'static str {
        match self {
            UnsupportedOperation::BeginTransaction
            | UnsupportedOperation::CommitTransaction
            | UnsupportedOperation::RollbackTransaction => "transactions are not supported yet",
            UnsupportedOperation::StreamQuery => "D1 does not support streaming query results",
        }
    }
}

impl std::fmt::Display for UnsupportedOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Errors produced by the D1 dialect, driver and connection
#[derive(Debug, Clone, Error, PartialEq)]
pub enum D1Error {
    /// The remote store reported an error while executing a statement
    #[error("{0}")]
    Remote(String),

    /// The operation can never succeed against D1
    #[error("{0}")]
    Unsupported(UnsupportedOperation),

    /// The request did not reach D1 or its error response could not be read
    #[error("D1 transport error: {0}")]
    Transport(String),

    /// D1 answered with a payload that does not match the expected shape
    #[error("failed to decode D1 response: {0}")]
    Decode(String),

    /// Invalid configuration or connection URL
    #[error("invalid D1 configuration: {0}")]
    Config(String),
}

impl D1Error {
    /// Whether this error is a permanent capability gap that must not be retried
    pub fn is_unsupported(&self) -> bool {
        matches!(self, D1Error::Unsupported(_))
    }

    /// The remote store's message, if this error came from the store
    pub fn remote_message(&self) -> Option<&str> {
        match self {
            D1Error::Remote(message) => Some(message),
            _ => None,
        }
    }
}

impl From<D1Error> for diesel::result::Error {
    fn from(error: D1Error) -> Self {
        diesel::result::Error::DatabaseError(
            DatabaseErrorKind::Unknown,
            Box::new(D1ErrorInformation::new(error.to_string())),
        )
    }
}

impl From<D1Error> for diesel::ConnectionError {
    fn from(error: D1Error) -> Self {
        diesel::ConnectionError::BadConnection(error.to_string())
    }
}

/// Error information handed to Diesel for failed D1 statements
#[derive(Debug, Clone)]
pub struct D1ErrorInformation {
    message: String,
}

impl D1ErrorInformation {
    /// Create a new error information value with the given message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl DatabaseErrorInformation for D1ErrorInformation {
    fn message(&self) -> &str {
        &self.message
    }

    fn details(&self) -> Option<&str> {
        None
    }

    fn hint(&self) -> Option<&str> {
        None
    }

    fn table_name(&self) -> Option<&str> {
        None
    }

    fn column_name(&self) -> Option<&str> {
        None
    }

    fn constraint_name(&self) -> Option<&str> {
        None
    }

    fn statement_position(&self) -> Option<i32> {
        None
    }
}

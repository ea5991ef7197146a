//! The remote store contract
//!
//! D1 exposes a prepare / bind / execute surface. [`D1Database`] is the handle a
//! dialect is configured with; the HTTP client in [`crate::http`] is one
//! implementation, and anything else that can run SQLite statements remotely can
//! provide another.

use async_trait::async_trait;
use serde::Deserialize;

use crate::{bind_collector::BindValue, error::D1Error};

/// One result row, keyed by column name in column order
pub type D1Record = serde_json::Map<String, serde_json::Value>;

/// Execution metadata reported by D1 alongside every result
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct D1Meta {
    /// Rows scanned while executing the statement
    #[serde(default)]
    pub rows_read: u64,
    /// Rows inserted, updated or deleted by the statement
    #[serde(default)]
    pub rows_written: u64,
    /// Rows changed, as reported by `sqlite3_changes`
    #[serde(default)]
    pub changes: Option<u64>,
    /// Server-side duration in milliseconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Rowid of the last inserted row
    #[serde(default)]
    pub last_row_id: Option<i64>,
    /// Whether the statement modified the database
    #[serde(default)]
    pub changed_db: Option<bool>,
    /// Database size in bytes after the statement
    #[serde(default)]
    pub size_after: Option<u64>,
}

/// Result rows by position, next to the column list they share
///
/// Unlike [`D1Record`]s, these keep every column when a SELECT list repeats a
/// name, as joins commonly do.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct D1RawRows {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl D1RawRows {
    /// Fails when a row does not have one value per column
    pub fn validate(&self) -> Result<(), D1Error> {
        match self.rows.iter().find(|row| row.len() != self.columns.len()) {
            Some(row) => Err(D1Error::Decode(format!(
                "row has {} values for {} columns",
                row.len(),
                self.columns.len()
            ))),
            None => Ok(()),
        }
    }

    /// Rows keyed by column name; a repeated name keeps its last value
    pub fn to_records(&self) -> Vec<D1Record> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }
}

/// The outcome of running one prepared statement
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct D1Result {
    /// Error reported by D1; when set the other fields carry no meaning
    #[serde(default)]
    pub error: Option<String>,
    /// Execution metadata
    #[serde(default)]
    pub meta: D1Meta,
    /// Result rows, empty for statements that return none
    #[serde(default)]
    pub results: Vec<D1Record>,
    /// The same rows by position, when the store reports them that way
    #[serde(default)]
    pub raw: Option<D1RawRows>,
}

impl D1Result {
    /// A successful result with the given rows and metadata
    pub fn success(results: Vec<D1Record>, meta: D1Meta) -> Self {
        Self {
            error: None,
            meta,
            results,
            raw: None,
        }
    }

    /// A successful result from positional rows
    pub fn success_raw(raw: D1RawRows, meta: D1Meta) -> Result<Self, D1Error> {
        raw.validate()?;
        Ok(Self {
            error: None,
            meta,
            results: raw.to_records(),
            raw: Some(raw),
        })
    }

    /// A result carrying an error reported by the store
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// A handle to a D1 database
pub trait D1Database: Send + Sync + 'static {
    /// The statement type produced by [`D1Database::prepare`]
    type Statement: D1PreparedStatement;

    /// Prepare a statement for the given SQL text
    ///
    /// Preparing never touches the network; the statement is sent by
    /// [`D1PreparedStatement::all`].
    fn prepare(&self, sql: &str) -> Self::Statement;
}

/// A statement that has been prepared against a [`D1Database`]
#[async_trait]
pub trait D1PreparedStatement: Send + Sized {
    /// Attach positional parameters, replacing any bound earlier
    fn bind(self, params: Vec<BindValue>) -> Self;

    /// Execute the statement and collect every result row
    ///
    /// Errors raised by SQLite are reported through [`D1Result::error`]; `Err` is
    /// reserved for failures to reach the store or to read its answer.
    async fn all(self) -> Result<D1Result, D1Error>;
}

/// Construct a store from a connection URL, used by `AsyncConnection::establish`
pub trait FromDatabaseUrl: Sized {
    /// Parse the URL and build the store
    fn from_database_url(database_url: &str) -> Result<Self, D1Error>;
}

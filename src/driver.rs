//! The driver contract and its D1 implementation
//!
//! A query builder talks to a database through two traits: a [`Driver`] that hands
//! out connections and brackets transactions, and a [`DatabaseConnection`] that runs
//! compiled queries. [`D1Driver`] implements the former on top of [`D1Connection`].

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::{
    compiler::CompiledQuery,
    connection::{D1Connection, D1QueryResult},
    dialect::D1DialectConfig,
    error::D1Error,
    store::D1Database,
};

/// Transaction isolation levels a caller may request
///
/// D1 opens no transactions, so the level is accepted and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// `READ UNCOMMITTED`
    ReadUncommitted,
    /// `READ COMMITTED`
    ReadCommitted,
    /// `REPEATABLE READ`
    RepeatableRead,
    /// `SERIALIZABLE`
    Serializable,
    /// `SNAPSHOT`
    Snapshot,
}

/// Settings passed when opening a transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionSettings {
    /// Requested isolation level, if any
    pub isolation_level: Option<IsolationLevel>,
}

/// A connection able to execute compiled queries
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
    /// Execute one compiled query and return its normalized result
    async fn execute_query(&self, query: &CompiledQuery) -> Result<D1QueryResult, D1Error>;

    /// Execute a query and deliver its rows in chunks
    async fn stream_query(
        &self,
        query: &CompiledQuery,
        chunk_size: Option<usize>,
    ) -> Result<BoxStream<'static, Result<D1QueryResult, D1Error>>, D1Error>;
}

/// Connection lifecycle management
#[async_trait]
pub trait Driver: Send + Sync {
    /// The connection type handed out by this driver
    type Connection: DatabaseConnection;

    /// Prepare the driver for use
    async fn init(&self) -> Result<(), D1Error>;

    /// Obtain a connection
    async fn acquire_connection(&self) -> Result<Self::Connection, D1Error>;

    /// Open a transaction on `connection`
    async fn begin_transaction(
        &self,
        connection: &Self::Connection,
        settings: &TransactionSettings,
    ) -> Result<(), D1Error>;

    /// Commit the transaction open on `connection`
    async fn commit_transaction(&self, connection: &Self::Connection) -> Result<(), D1Error>;

    /// Roll back the transaction open on `connection`
    async fn rollback_transaction(&self, connection: &Self::Connection) -> Result<(), D1Error>;

    /// Give a connection back
    async fn release_connection(&self, connection: Self::Connection) -> Result<(), D1Error>;

    /// Tear the driver down
    async fn destroy(&self) -> Result<(), D1Error>;
}

/// Driver handing out [`D1Connection`]s over a shared store handle
///
/// There is no pool: every acquisition builds a fresh connection, and releasing a
/// connection just drops it. None of the lifecycle calls reach the store.
pub struct D1Driver<S> {
    database: Arc<S>,
}

impl<S: D1Database> D1Driver<S> {
    /// Create a driver from a dialect configuration
    pub fn new(config: &D1DialectConfig<S>) -> Self {
        Self {
            database: Arc::clone(&config.database),
        }
    }
}

impl<S> Clone for D1Driver<S> {
    fn clone(&self) -> Self {
        Self {
            database: Arc::clone(&self.database),
        }
    }
}

#[async_trait]
impl<S: D1Database> Driver for D1Driver<S> {
    type Connection = D1Connection<S>;

    async fn init(&self) -> Result<(), D1Error> {
        Ok(())
    }

    async fn acquire_connection(&self) -> Result<D1Connection<S>, D1Error> {
        Ok(D1Connection::new(Arc::clone(&self.database)))
    }

    async fn begin_transaction(
        &self,
        connection: &D1Connection<S>,
        _settings: &TransactionSettings,
    ) -> Result<(), D1Error> {
        connection.begin_transaction().await
    }

    async fn commit_transaction(&self, connection: &D1Connection<S>) -> Result<(), D1Error> {
        connection.commit_transaction().await
    }

    async fn rollback_transaction(&self, connection: &D1Connection<S>) -> Result<(), D1Error> {
        connection.rollback_transaction().await
    }

    async fn release_connection(&self, _connection: D1Connection<S>) -> Result<(), D1Error> {
        Ok(())
    }

    async fn destroy(&self) -> Result<(), D1Error> {
        Ok(())
    }
}

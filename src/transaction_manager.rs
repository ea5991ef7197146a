//! Transaction Manager for D1 Backend
//!
//! D1's HTTP surface executes statements one request at a time and has no way to
//! hold a transaction open between requests. Opening, committing and rolling back
//! therefore always fail with [`D1Error::Unsupported`], both through
//! `AsyncConnection::transaction` and through the driver.

use async_trait::async_trait;
use diesel::{connection::TransactionManagerStatus, QueryResult};
use diesel_async::TransactionManager;

use crate::{
    connection::D1Connection,
    error::D1Error,
    store::{D1Database, FromDatabaseUrl},
};

/// Transaction Manager for D1 connections
#[derive(Default)]
pub struct D1TransactionManager {
    status: TransactionManagerStatus,
}

impl D1TransactionManager {
    /// Create a new transaction manager
    pub fn new() -> Self {
        Self::default()
    }
}

fn into_query_result(result: Result<(), D1Error>) -> QueryResult<()> {
    result.map_err(diesel::result::Error::from)
}

#[async_trait]
impl<S> TransactionManager<D1Connection<S>> for D1TransactionManager
where
    S: D1Database + FromDatabaseUrl,
{
    type TransactionStateData = Self;

    async fn begin_transaction(conn: &mut D1Connection<S>) -> QueryResult<()> {
        into_query_result(conn.begin_transaction().await)
    }

    async fn rollback_transaction(conn: &mut D1Connection<S>) -> QueryResult<()> {
        into_query_result(conn.rollback_transaction().await)
    }

    async fn commit_transaction(conn: &mut D1Connection<S>) -> QueryResult<()> {
        into_query_result(conn.commit_transaction().await)
    }

    fn transaction_manager_status_mut(conn: &mut D1Connection<S>) -> &mut TransactionManagerStatus {
        &mut conn.transaction_manager.status
    }
}

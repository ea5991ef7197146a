//! The D1 connection adapter
//!
//! A [`D1Connection`] wraps one store handle and runs compiled queries through the
//! store's prepare / bind / all calls. Transactions and streaming are not offered
//! by D1 and always fail with [`D1Error::Unsupported`].
//!
//! The same type is a `diesel_async::AsyncConnection`, so typed Diesel queries can
//! be run against it directly.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use diesel::{
    connection::{ConnectionSealed, Instrumentation, InstrumentationEvent, StrQueryHelper},
    query_builder::{AsQuery, QueryFragment, QueryId},
    ConnectionResult,
};
use diesel_async::{AsyncConnection, SimpleAsyncConnection};
use futures_util::{
    future::BoxFuture,
    stream::{self, BoxStream},
    FutureExt, StreamExt,
};
use num_bigint::BigInt;
use num_traits::FromPrimitive;
use serde_json::Value as JsonValue;
use tracing::{debug, debug_span, trace, Instrument};

use crate::{
    backend::D1Backend,
    compiler::{CompiledQuery, D1QueryCompiler},
    driver::DatabaseConnection,
    error::{D1Error, UnsupportedOperation},
    row::D1Row,
    store::{D1Database, D1Meta, D1PreparedStatement, D1Record, D1Result, FromDatabaseUrl},
    transaction_manager::D1TransactionManager,
};

/// The normalized outcome of executing a compiled query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct D1QueryResult {
    /// The `id` of the last returned row, when it is present and an integer
    pub insert_id: Option<BigInt>,
    /// Every row returned by the statement
    pub rows: Vec<D1Record>,
    /// Rows read plus rows written, as reported by D1
    pub num_affected_rows: u64,
    /// Rows changed by the statement, when D1 reports it
    pub num_changed_rows: Option<u64>,
}

impl D1QueryResult {
    pub(crate) fn from_rows(rows: Vec<D1Record>, meta: &D1Meta) -> Self {
        Self {
            insert_id: last_row_id(&rows),
            num_affected_rows: meta.rows_read + meta.rows_written,
            num_changed_rows: meta.changes,
            rows,
        }
    }
}

fn last_row_id(rows: &[D1Record]) -> Option<BigInt> {
    match rows.last()?.get("id")? {
        JsonValue::Number(n) => n
            .as_i64()
            .map(BigInt::from)
            .or_else(|| n.as_u64().map(BigInt::from))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .and_then(BigInt::from_f64)
            }),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Run one compiled query against a store, turning a reported error into `Err`
async fn run_statement<S>(database: &S, query: &CompiledQuery) -> Result<D1Result, D1Error>
where
    S: D1Database + ?Sized,
{
    let span = debug_span!(
        "d1.query",
        db.system = "d1",
        db.statement = %query.sql,
        params = query.parameters.len(),
    );

    async move {
        let result = database
            .prepare(&query.sql)
            .bind(query.parameters.clone())
            .all()
            .await?;

        if let Some(message) = result.error {
            debug!(error = %message, "D1 rejected the statement");
            return Err(D1Error::Remote(message));
        }

        trace!(
            rows = result.results.len(),
            rows_read = result.meta.rows_read,
            rows_written = result.meta.rows_written,
            "query finished"
        );
        Ok(result)
    }
    .instrument(span)
    .await
}

/// Run one compiled query against a store
pub(crate) async fn run_query<S>(database: &S, query: &CompiledQuery) -> Result<D1QueryResult, D1Error>
where
    S: D1Database + ?Sized,
{
    let result = run_statement(database, query).await?;
    Ok(D1QueryResult::from_rows(result.results, &result.meta))
}

/// Rows for Diesel, by position when the store kept them that way
fn diesel_rows(result: D1Result) -> Vec<D1Row> {
    match result.raw {
        Some(raw) => {
            let names: Arc<[String]> = raw.columns.into();
            raw.rows
                .into_iter()
                .map(|values| D1Row::new(Arc::clone(&names), values))
                .collect()
        }
        None => result.results.into_iter().map(D1Row::from).collect(),
    }
}

/// A single logical link to a D1 database
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use diesel_d1_dialect::{CompiledQuery, D1Connection, D1HttpConfig, D1HttpDatabase};
///
/// let database = D1HttpDatabase::new(D1HttpConfig::new("account", "database", "token"));
/// let conn = D1Connection::new(Arc::new(database));
/// let result = conn
///     .execute_query(&CompiledQuery::raw("SELECT * FROM t WHERE x = ?", vec![5.into()]))
///     .await?;
/// ```
pub struct D1Connection<S> {
    database: Arc<S>,
    pub(crate) transaction_manager: D1TransactionManager,
    instrumentation: Mutex<Option<Box<dyn Instrumentation>>>,
}

impl<S: D1Database> D1Connection<S> {
    /// Create a connection over a shared store handle
    pub fn new(database: Arc<S>) -> Self {
        Self {
            database,
            transaction_manager: D1TransactionManager::default(),
            instrumentation: Mutex::new(None),
        }
    }

    /// The store this connection sends statements to
    pub fn database(&self) -> &S {
        &self.database
    }

    /// Send the query's SQL and parameters to the store and normalize the result
    pub async fn execute_query(&self, query: &CompiledQuery) -> Result<D1QueryResult, D1Error> {
        run_query(self.database.as_ref(), query).await
    }

    /// Always fails: D1 has no interactive transactions
    pub async fn begin_transaction(&self) -> Result<(), D1Error> {
        Err(D1Error::Unsupported(UnsupportedOperation::BeginTransaction))
    }

    /// Always fails: D1 has no interactive transactions
    pub async fn commit_transaction(&self) -> Result<(), D1Error> {
        Err(D1Error::Unsupported(UnsupportedOperation::CommitTransaction))
    }

    /// Always fails: D1 has no interactive transactions
    pub async fn rollback_transaction(&self) -> Result<(), D1Error> {
        Err(D1Error::Unsupported(UnsupportedOperation::RollbackTransaction))
    }

    /// Always fails: D1 returns complete result sets only
    pub async fn stream_query(
        &self,
        _query: &CompiledQuery,
        _chunk_size: Option<usize>,
    ) -> Result<BoxStream<'static, Result<D1QueryResult, D1Error>>, D1Error> {
        Err(D1Error::Unsupported(UnsupportedOperation::StreamQuery))
    }

    fn instrumentation_mut(&mut self) -> &mut dyn Instrumentation {
        self.instrumentation
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(|| Box::new(NoopInstrumentation))
            .as_mut()
    }

    async fn run_instrumented(&mut self, query: CompiledQuery) -> diesel::QueryResult<D1Result> {
        self.instrumentation_mut()
            .on_connection_event(InstrumentationEvent::start_query(&StrQueryHelper::new(
                &query.sql,
            )));

        let result = run_statement(self.database.as_ref(), &query)
            .await
            .map_err(diesel::result::Error::from);

        self.instrumentation_mut()
            .on_connection_event(InstrumentationEvent::finish_query(
                &StrQueryHelper::new(&query.sql),
                result.as_ref().err(),
            ));
        result
    }
}

#[async_trait]
impl<S: D1Database> DatabaseConnection for D1Connection<S> {
    async fn execute_query(&self, query: &CompiledQuery) -> Result<D1QueryResult, D1Error> {
        D1Connection::execute_query(self, query).await
    }

    async fn stream_query(
        &self,
        query: &CompiledQuery,
        chunk_size: Option<usize>,
    ) -> Result<BoxStream<'static, Result<D1QueryResult, D1Error>>, D1Error> {
        D1Connection::stream_query(self, query, chunk_size).await
    }
}

#[async_trait]
impl<S: D1Database> SimpleAsyncConnection for D1Connection<S> {
    async fn batch_execute(&mut self, query: &str) -> diesel::QueryResult<()> {
        self.run_instrumented(CompiledQuery::raw(query, Vec::new()))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<S> AsyncConnection for D1Connection<S>
where
    S: D1Database + FromDatabaseUrl,
{
    type Backend = D1Backend;
    type TransactionManager = D1TransactionManager;
    type ExecuteFuture<'conn, 'query> = BoxFuture<'conn, diesel::QueryResult<usize>>;
    type LoadFuture<'conn, 'query> =
        BoxFuture<'conn, diesel::QueryResult<Self::Stream<'conn, 'query>>>;
    type Stream<'conn, 'query> = BoxStream<'conn, diesel::QueryResult<Self::Row<'conn, 'query>>>;
    type Row<'conn, 'query> = D1Row;

    async fn establish(database_url: &str) -> ConnectionResult<Self> {
        let database = S::from_database_url(database_url)?;
        Ok(Self::new(Arc::new(database)))
    }

    fn load<'conn, 'query, T>(&'conn mut self, source: T) -> Self::LoadFuture<'conn, 'query>
    where
        T: AsQuery + 'query,
        T::Query: QueryFragment<Self::Backend> + QueryId + 'query,
    {
        let compiled = D1QueryCompiler.compile(&source.as_query());

        async move {
            let result = self.run_instrumented(compiled?).await?;
            let rows: Vec<diesel::QueryResult<D1Row>> =
                diesel_rows(result).into_iter().map(Ok).collect();
            Ok(stream::iter(rows).boxed())
        }
        .boxed()
    }

    fn execute_returning_count<'conn, 'query, T>(
        &'conn mut self,
        source: T,
    ) -> Self::ExecuteFuture<'conn, 'query>
    where
        T: QueryFragment<Self::Backend> + QueryId + 'query,
    {
        let compiled = D1QueryCompiler.compile(&source);

        async move {
            let result = self.run_instrumented(compiled?).await?;
            Ok(result.meta.changes.unwrap_or(0) as usize)
        }
        .boxed()
    }

    fn transaction_state(&mut self) -> &mut D1TransactionManager {
        &mut self.transaction_manager
    }

    fn instrumentation(&mut self) -> &mut dyn Instrumentation {
        self.instrumentation_mut()
    }

    fn set_instrumentation(&mut self, instrumentation: impl Instrumentation) {
        *self
            .instrumentation
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = Some(Box::new(instrumentation));
    }
}

impl<S> ConnectionSealed for D1Connection<S> {}

struct NoopInstrumentation;

impl Instrumentation for NoopInstrumentation {
    fn on_connection_event(&mut self, _event: InstrumentationEvent<'_>) {}
}

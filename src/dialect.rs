//! The D1 dialect: the entry point tying adapter, driver, compiler and introspector
//! together over one store handle

use std::sync::Arc;

use crate::{
    adapter::{D1Adapter, DialectAdapter},
    compiler::D1QueryCompiler,
    driver::{D1Driver, Driver},
    introspector::SqliteIntrospector,
    store::D1Database,
};

/// Configuration for [`D1Dialect`]
pub struct D1DialectConfig<S> {
    /// The store every connection sends its statements to
    pub database: Arc<S>,
}

impl<S: D1Database> D1DialectConfig<S> {
    /// Configure a dialect over an owned store
    pub fn new(database: S) -> Self {
        Self {
            database: Arc::new(database),
        }
    }

    /// Configure a dialect over a store that is already shared
    pub fn from_shared(database: Arc<S>) -> Self {
        Self { database }
    }
}

impl<S> Clone for D1DialectConfig<S> {
    fn clone(&self) -> Self {
        Self {
            database: Arc::clone(&self.database),
        }
    }
}

/// Factory for the pieces a query builder needs to target a database
pub trait Dialect {
    /// Capability flags and migration locking
    type Adapter: DialectAdapter;
    /// Hands out connections
    type Driver: Driver;
    /// Turns query trees into SQL plus parameters
    type Compiler;
    /// Reads schema metadata
    type Introspector;

    /// Build the adapter
    fn create_adapter(&self) -> Self::Adapter;
    /// Build a driver over the configured store
    fn create_driver(&self) -> Self::Driver;
    /// Build a query compiler
    fn create_query_compiler(&self) -> Self::Compiler;
    /// Build an introspector that acquires connections from a fresh driver
    fn create_introspector(&self) -> Self::Introspector;
}

/// SQLite dialect running against Cloudflare D1
///
/// ```ignore
/// use diesel_d1_dialect::{D1Dialect, D1HttpConfig, D1HttpDatabase, Dialect, Driver};
///
/// let dialect = D1Dialect::from_database(D1HttpDatabase::new(D1HttpConfig::from_env()?));
/// let driver = dialect.create_driver();
/// let connection = driver.acquire_connection().await?;
/// ```
pub struct D1Dialect<S> {
    config: D1DialectConfig<S>,
}

impl<S: D1Database> D1Dialect<S> {
    /// Create a dialect from its configuration
    pub fn new(config: D1DialectConfig<S>) -> Self {
        Self { config }
    }

    /// Shorthand for `D1Dialect::new(D1DialectConfig::new(database))`
    pub fn from_database(database: S) -> Self {
        Self::new(D1DialectConfig::new(database))
    }

    /// The configuration this dialect was created with
    pub fn config(&self) -> &D1DialectConfig<S> {
        &self.config
    }
}

impl<S: D1Database> Dialect for D1Dialect<S> {
    type Adapter = D1Adapter;
    type Driver = D1Driver<S>;
    type Compiler = D1QueryCompiler;
    type Introspector = SqliteIntrospector<D1Driver<S>>;

    fn create_adapter(&self) -> D1Adapter {
        D1Adapter
    }

    fn create_driver(&self) -> D1Driver<S> {
        D1Driver::new(&self.config)
    }

    fn create_query_compiler(&self) -> D1QueryCompiler {
        D1QueryCompiler
    }

    fn create_introspector(&self) -> SqliteIntrospector<D1Driver<S>> {
        SqliteIntrospector::new(self.create_driver())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind_collector::BindValue;
    use crate::compiler::CompiledQuery;
    use crate::driver::DatabaseConnection;
    use crate::store::{D1Meta, D1Result};
    use crate::testing::{record, MockDatabase};
    use diesel::prelude::*;
    use num_bigint::BigInt;
    use serde_json::json;

    diesel::table! {
        t (id) {
            id -> Integer,
            x -> Integer,
        }
    }

    #[tokio::test]
    async fn test_compile_and_execute_through_dialect() {
        let database = MockDatabase::new().with_result(D1Result::success(
            vec![record(json!({"id": 7, "x": 5}))],
            D1Meta {
                rows_read: 1,
                ..D1Meta::default()
            },
        ));
        let dialect = D1Dialect::from_database(database.clone());

        let compiled = dialect
            .create_query_compiler()
            .compile(&t::table.filter(t::x.eq(5)))
            .unwrap();
        let driver = dialect.create_driver();
        driver.init().await.unwrap();
        let connection = driver.acquire_connection().await.unwrap();
        let result = connection.execute_query(&compiled).await.unwrap();

        assert_eq!(result.insert_id, Some(BigInt::from(7)));
        assert_eq!(result.num_affected_rows, 1);
        assert_eq!(database.executed()[0].parameters, vec![BindValue::Integer(5)]);
    }

    #[test]
    fn test_adapter_capabilities() {
        let dialect = D1Dialect::from_database(MockDatabase::new());
        let adapter = dialect.create_adapter();
        assert!(adapter.supports_returning());
        assert!(!adapter.supports_transactional_ddl());
    }

    #[tokio::test]
    async fn test_drivers_share_configured_store() {
        let database = MockDatabase::new();
        let dialect = D1Dialect::new(D1DialectConfig::from_shared(Arc::new(database.clone())));

        for sql in ["SELECT 1", "SELECT 2"] {
            let connection = dialect.create_driver().acquire_connection().await.unwrap();
            DatabaseConnection::execute_query(&connection, &CompiledQuery::raw(sql, vec![]))
                .await
                .unwrap();
        }
        assert_eq!(database.executed().len(), 2);
    }
}

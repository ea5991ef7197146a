//! # Diesel D1 Dialect
//!
//! A SQLite dialect, driver and connection adapter for Cloudflare D1.
//!
//! Queries are built with Diesel, compiled to SQLite SQL with positional `?`
//! parameters and sent through a [`D1Database`] handle. The bundled HTTP store talks
//! to the D1 REST API; any other handle exposing prepare / bind / all works as well.
//!
//! D1 executes one statement per request, so interactive transactions and streamed
//! results are not available and fail with [`D1Error::Unsupported`].
//!
//! ## Features
//!
//! - `http` (default) - [`D1HttpDatabase`], a store backed by the Cloudflare REST API
//!
//! ## Usage
//!
//! ```ignore
//! use diesel_d1_dialect::{D1Dialect, D1HttpConfig, D1HttpDatabase, Dialect, Driver};
//!
//! let dialect = D1Dialect::from_database(D1HttpDatabase::new(D1HttpConfig::from_env()?));
//! let query = dialect.create_query_compiler().compile(&users::table.filter(users::id.eq(7)))?;
//! let connection = dialect.create_driver().acquire_connection().await?;
//! let result = connection.execute_query(&query).await?;
//! ```

pub mod adapter;
pub mod backend;
mod bind_collector;
pub mod compiler;
pub mod connection;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod introspector;
mod query_builder;
mod row;
pub mod store;
mod transaction_manager;
mod types;
pub mod unstable;
mod value;

#[cfg(feature = "http")]
pub mod http;

#[cfg(test)]
mod testing;

// Re-exports
pub use adapter::{D1Adapter, DialectAdapter};
pub use backend::D1Backend;
pub use bind_collector::BindValue;
pub use compiler::{CompiledQuery, D1QueryCompiler};
pub use connection::{D1Connection, D1QueryResult};
pub use dialect::{D1Dialect, D1DialectConfig, Dialect};
pub use driver::{D1Driver, DatabaseConnection, Driver, IsolationLevel, TransactionSettings};
pub use error::{D1Error, UnsupportedOperation};
pub use introspector::{
    ColumnMetadata, DatabaseMetadata, DatabaseMetadataOptions, SchemaMetadata,
    SqliteIntrospector, TableMetadata,
};
pub use row::{D1Field, D1Row};
pub use store::{
    D1Database, D1Meta, D1PreparedStatement, D1RawRows, D1Record, D1Result, FromDatabaseUrl,
};
pub use transaction_manager::D1TransactionManager;
pub use value::D1Value;

#[cfg(feature = "http")]
pub use http::{D1HttpConfig, D1HttpDatabase};

//! Dialects whose behaviour may still change between minor releases

#[cfg(feature = "http")]
pub use raw::D1RawDialect;

#[cfg(feature = "http")]
mod raw {
    use crate::{
        adapter::D1Adapter,
        compiler::D1QueryCompiler,
        dialect::{D1Dialect, Dialect},
        driver::D1Driver,
        http::{D1HttpConfig, D1HttpDatabase, WireFormat},
        introspector::SqliteIntrospector,
    };

    /// D1 dialect reading results from the `/raw` endpoint
    ///
    /// Rows come back as value arrays next to a single column list. Diesel loads
    /// read them by position, so joins selecting the same column name twice get
    /// every value. The records in [`crate::D1QueryResult::rows`] are keyed by
    /// name and keep only the last of a repeated column.
    pub struct D1RawDialect {
        inner: D1Dialect<D1HttpDatabase>,
    }

    impl D1RawDialect {
        pub fn new(config: D1HttpConfig) -> Self {
            Self::from_database(D1HttpDatabase::raw(config))
        }

        /// Wrap an existing HTTP store, switching it to the raw endpoint
        pub fn from_database(database: D1HttpDatabase) -> Self {
            Self {
                inner: D1Dialect::from_database(database.with_format(WireFormat::Raw)),
            }
        }

        pub fn database(&self) -> &D1HttpDatabase {
            &self.inner.config().database
        }
    }

    impl Dialect for D1RawDialect {
        type Adapter = D1Adapter;
        type Driver = D1Driver<D1HttpDatabase>;
        type Compiler = D1QueryCompiler;
        type Introspector = SqliteIntrospector<D1Driver<D1HttpDatabase>>;

        fn create_adapter(&self) -> D1Adapter {
            self.inner.create_adapter()
        }

        fn create_driver(&self) -> Self::Driver {
            self.inner.create_driver()
        }

        fn create_query_compiler(&self) -> D1QueryCompiler {
            self.inner.create_query_compiler()
        }

        fn create_introspector(&self) -> Self::Introspector {
            self.inner.create_introspector()
        }
    }

}

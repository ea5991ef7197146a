//! SQL-level capabilities of the D1 dialect

use async_trait::async_trait;

use crate::{driver::DatabaseConnection, error::D1Error};

/// Capabilities and migration hooks a dialect reports to the query builder
#[async_trait]
pub trait DialectAdapter: Send + Sync {
    /// Whether `INSERT`/`UPDATE`/`DELETE ... RETURNING` is available
    fn supports_returning(&self) -> bool;

    /// Whether schema changes can be rolled back inside a transaction
    fn supports_transactional_ddl(&self) -> bool;

    /// Take the lock guarding migrations
    async fn acquire_migration_lock(&self, connection: &dyn DatabaseConnection) -> Result<(), D1Error>;

    /// Release the lock taken by [`DialectAdapter::acquire_migration_lock`]
    async fn release_migration_lock(&self, connection: &dyn DatabaseConnection) -> Result<(), D1Error>;
}

/// SQLite capabilities as exposed by D1
///
/// D1 runs one statement per request, so there is no other writer to lock out and
/// the migration lock hooks do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct D1Adapter;

#[async_trait]
impl DialectAdapter for D1Adapter {
    fn supports_returning(&self) -> bool {
        true
    }

    fn supports_transactional_ddl(&self) -> bool {
        false
    }

    async fn acquire_migration_lock(&self, _connection: &dyn DatabaseConnection) -> Result<(), D1Error> {
        Ok(())
    }

    async fn release_migration_lock(&self, _connection: &dyn DatabaseConnection) -> Result<(), D1Error> {
        Ok(())
    }
}

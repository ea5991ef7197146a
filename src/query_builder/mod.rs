//! The D1 query builder
//!
//! This module provides the query builder implementation for the D1 backend,
//! which generates SQLite-compatible SQL.

use super::backend::D1Backend;
use diesel::query_builder::QueryBuilder;
use diesel::result::QueryResult;

mod limit_offset;

/// Constructs SQL queries for use with the D1 backend
#[derive(Default)]
pub struct D1QueryBuilder {
    sql: String,
}

impl D1QueryBuilder {
    /// Construct a new query builder with an empty query
    pub fn new() -> Self {
        D1QueryBuilder::default()
    }

    /// Get the current SQL string
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl QueryBuilder<D1Backend> for D1QueryBuilder {
    fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    fn push_identifier(&mut self, identifier: &str) -> QueryResult<()> {
        self.push_sql("`");
        self.push_sql(&identifier.replace('`', "``"));
        self.push_sql("`");
        Ok(())
    }

    fn push_bind_param(&mut self) {
        self.push_sql("?");
    }

    fn finish(self) -> String {
        self.sql
    }
}

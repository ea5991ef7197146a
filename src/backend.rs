//! D1 Backend implementation for Diesel
//!
//! D1 speaks SQLite, so the backend renders SQLite grammar: backtick-quoted
//! identifiers, `?` placeholders, and SQLite's LIMIT/OFFSET rules.

use diesel::{
    backend::{
        sql_dialect::{self, returning_clause::DoesNotSupportReturningClause},
        Backend, DieselReserveSpecialization, SqlDialect, TrustedBackend,
    },
    sql_types::TypeMetadata,
};

use crate::{bind_collector::D1BindCollector, query_builder::D1QueryBuilder, value::D1Value};

/// The D1 backend for Diesel
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Default)]
pub struct D1Backend;

/// D1 data types
///
/// These correspond to the SQLite type affinities used by D1.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum D1Type {
    /// Binary/blob data
    Binary,
    /// Text/string data
    Text,
    /// Double precision floating point
    Double,
    /// Integer (64-bit)
    Integer,
}

impl Backend for D1Backend {
    type QueryBuilder = D1QueryBuilder;
    type RawValue<'a> = D1Value<'a>;
    type BindCollector<'a> = D1BindCollector;
}

impl TypeMetadata for D1Backend {
    type TypeMetadata = D1Type;
    type MetadataLookup = ();
}

// RETURNING works in raw SQL (see `D1Adapter::supports_returning`), the DSL form is
// not wired up for this backend.
impl SqlDialect for D1Backend {
    type ReturningClause = DoesNotSupportReturningClause;
    type OnConflictClause = SqliteOnConflictClause;
    type InsertWithDefaultKeyword =
        sql_dialect::default_keyword_for_insert::DoesNotSupportDefaultKeyword;
    type BatchInsertSupport = SqliteBatchInsert;
    type ConcatClause = sql_dialect::concat_clause::ConcatWithPipesClause;
    type DefaultValueClauseForInsert = sql_dialect::default_value_clause::AnsiDefaultValueClause;
    type EmptyFromClauseSyntax = sql_dialect::from_clause_syntax::AnsiSqlFromClauseSyntax;
    type SelectStatementSyntax = sql_dialect::select_statement_syntax::AnsiSqlSelectStatement;
    type ExistsSyntax = sql_dialect::exists_syntax::AnsiSqlExistsSyntax;
    type ArrayComparison = sql_dialect::array_comparison::AnsiSqlArrayComparison;
    type AliasSyntax = sql_dialect::alias_syntax::AsAliasSyntax;
}

impl DieselReserveSpecialization for D1Backend {}
impl TrustedBackend for D1Backend {}

/// SQLite-compatible ON CONFLICT clause support
#[derive(Debug, Copy, Clone)]
pub struct SqliteOnConflictClause;

impl sql_dialect::on_conflict_clause::SupportsOnConflictClause for SqliteOnConflictClause {}
impl sql_dialect::on_conflict_clause::PgLikeOnConflictClause for SqliteOnConflictClause {}

/// SQLite-compatible batch insert support
#[derive(Debug, Copy, Clone)]
pub struct SqliteBatchInsert;

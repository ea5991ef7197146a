//! Schema introspection for SQLite databases reached through a [`Driver`]
//!
//! Tables and views come from `sqlite_master`, their columns from
//! `pragma_table_info`. D1 keeps its own bookkeeping in `_cf_*` tables, which are
//! never reported.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::{
    bind_collector::BindValue,
    compiler::CompiledQuery,
    driver::{DatabaseConnection, Driver},
    error::D1Error,
    store::D1Record,
};

/// Name of the table Diesel migrations keep their history in
pub const MIGRATION_TABLE: &str = "__diesel_schema_migrations";

const TABLES_QUERY: &str = "SELECT name, type, sql FROM sqlite_master \
    WHERE type IN ('table', 'view') \
    AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
    AND name NOT LIKE '\\_cf\\_%' ESCAPE '\\'";

const COLUMNS_QUERY: &str =
    "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?) ORDER BY cid";

static AUTOINCREMENT_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)[`"\[]?(\w+)[`"\]]?\s+integer\s+(?:not\s+null\s+)?primary\s+key\s+(?:asc\s+|desc\s+)?autoincrement"#,
    )
    .unwrap()
});

/// Options for [`SqliteIntrospector::get_tables`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatabaseMetadataOptions {
    /// Also report the migration history table
    pub with_internal_tables: bool,
}

/// A named schema; SQLite reports none
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMetadata {
    /// Schema name
    pub name: String,
}

/// One column of a table or view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMetadata {
    /// Column name
    pub name: String,
    /// Declared type, as written in the `CREATE` statement
    pub data_type: String,
    /// False when the column is declared `NOT NULL`
    pub is_nullable: bool,
    /// Whether the column declares a `DEFAULT`
    pub has_default_value: bool,
    /// Whether the column is an `INTEGER PRIMARY KEY AUTOINCREMENT`
    pub is_autoincrementing: bool,
}

/// A table or view with its columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    /// Table or view name
    pub name: String,
    /// True for views
    pub is_view: bool,
    /// Always `None`: SQLite has no schemas
    pub schema: Option<String>,
    /// Columns in declaration order
    pub columns: Vec<ColumnMetadata>,
}

/// Everything the introspector found in one database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseMetadata {
    /// Tables and views, ordered by name
    pub tables: Vec<TableMetadata>,
}

/// Reads table and column metadata over connections from `D`
pub struct SqliteIntrospector<D> {
    driver: D,
}

impl<D: Driver> SqliteIntrospector<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    /// SQLite has no schemas, so this is always empty
    pub async fn get_schemas(&self) -> Result<Vec<SchemaMetadata>, D1Error> {
        Ok(Vec::new())
    }

    /// Every user table and view, ordered by name
    pub async fn get_tables(
        &self,
        options: DatabaseMetadataOptions,
    ) -> Result<Vec<TableMetadata>, D1Error> {
        let connection = self.driver.acquire_connection().await?;
        let tables = read_tables(&connection, options).await;
        self.driver.release_connection(connection).await?;
        tables
    }

    pub async fn get_metadata(
        &self,
        options: DatabaseMetadataOptions,
    ) -> Result<DatabaseMetadata, D1Error> {
        Ok(DatabaseMetadata {
            tables: self.get_tables(options).await?,
        })
    }
}

async fn read_tables<C: DatabaseConnection>(
    connection: &C,
    options: DatabaseMetadataOptions,
) -> Result<Vec<TableMetadata>, D1Error> {
    let mut sql = TABLES_QUERY.to_string();
    let mut parameters = Vec::new();
    if !options.with_internal_tables {
        sql.push_str(" AND name != ?");
        parameters.push(BindValue::from(MIGRATION_TABLE));
    }
    sql.push_str(" ORDER BY name");

    let result = connection
        .execute_query(&CompiledQuery::raw(sql, parameters))
        .await?;

    let mut tables = Vec::with_capacity(result.rows.len());
    for row in &result.rows {
        let name = text(row, "name")?;
        let is_view = text(row, "type")? == "view";
        let create_sql = row.get("sql").and_then(Value::as_str).unwrap_or_default();
        let columns = read_columns(connection, name, create_sql).await?;

        tables.push(TableMetadata {
            name: name.to_string(),
            is_view,
            schema: None,
            columns,
        });
    }
    Ok(tables)
}

async fn read_columns<C: DatabaseConnection>(
    connection: &C,
    table: &str,
    create_sql: &str,
) -> Result<Vec<ColumnMetadata>, D1Error> {
    let result = connection
        .execute_query(&CompiledQuery::raw(
            COLUMNS_QUERY,
            vec![BindValue::from(table)],
        ))
        .await?;

    let autoincrement = autoincrement_column(create_sql, &result.rows)?;
    result
        .rows
        .iter()
        .map(|row| {
            let name = text(row, "name")?;
            Ok(ColumnMetadata {
                name: name.to_string(),
                data_type: text(row, "type")?.to_string(),
                is_nullable: integer(row, "notnull") == 0,
                has_default_value: !row.get("dflt_value").map_or(true, Value::is_null),
                is_autoincrementing: autoincrement.as_deref() == Some(name),
            })
        })
        .collect()
}

/// The column SQLite assigns rowids to, if any
fn autoincrement_column(create_sql: &str, columns: &[D1Record]) -> Result<Option<String>, D1Error> {
    if let Some(captures) = AUTOINCREMENT_COLUMN.captures(create_sql) {
        return Ok(Some(captures[1].to_string()));
    }

    let mut primary_keys = columns.iter().filter(|row| integer(row, "pk") > 0);
    match (primary_keys.next(), primary_keys.next()) {
        (Some(row), None) if text(row, "type")?.eq_ignore_ascii_case("integer") => {
            Ok(Some(text(row, "name")?.to_string()))
        }
        _ => Ok(None),
    }
}

fn text<'a>(row: &'a D1Record, column: &str) -> Result<&'a str, D1Error> {
    row.get(column)
        .and_then(Value::as_str)
        .ok_or_else(|| D1Error::Decode(format!("expected text in column `{column}`")))
}

fn integer(row: &D1Record, column: &str) -> i64 {
    row.get(column).and_then(Value::as_i64).unwrap_or_default()
}

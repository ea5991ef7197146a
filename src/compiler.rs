//! Compiling Diesel queries into SQL text plus positional parameters

use diesel::query_builder::{QueryBuilder, QueryFragment};
use diesel::QueryResult;

use crate::{
    backend::D1Backend,
    bind_collector::{BindValue, D1BindCollector},
    query_builder::D1QueryBuilder,
};

/// SQL text and the parameters bound to its `?` placeholders, in order
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Rendered SQLite statement
    pub sql: String,
    /// Positional parameters
    pub parameters: Vec<BindValue>,
}

impl CompiledQuery {
    /// A query from already rendered SQL
    pub fn raw(sql: impl Into<String>, parameters: Vec<BindValue>) -> Self {
        Self {
            sql: sql.into(),
            parameters,
        }
    }
}

/// Renders Diesel query fragments with SQLite grammar
#[derive(Debug, Clone, Copy, Default)]
pub struct D1QueryCompiler;

impl D1QueryCompiler {
    /// Render `query` and collect its bind parameters
    pub fn compile<T>(&self, query: &T) -> QueryResult<CompiledQuery>
    where
        T: QueryFragment<D1Backend> + ?Sized,
    {
        let mut query_builder = D1QueryBuilder::new();
        query.to_sql(&mut query_builder, &D1Backend)?;

        let mut bind_collector = D1BindCollector::default();
        query.collect_binds(&mut bind_collector, &mut (), &D1Backend)?;

        Ok(CompiledQuery {
            sql: query_builder.finish(),
            parameters: bind_collector.into_values(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::prelude::*;

    diesel::table! {
        users (id) {
            id -> Integer,
            name -> Text,
            email -> Nullable<Text>,
        }
    }

    #[test]
    fn test_compile_select_with_binds() {
        let query = users::table
            .filter(users::id.eq(5))
            .filter(users::name.eq("ada"))
            .select(users::id);

        let compiled = D1QueryCompiler.compile(&query).unwrap();
        assert!(compiled
            .sql
            .starts_with("SELECT `users`.`id` FROM `users` WHERE "));
        assert!(compiled.sql.contains("`users`.`id` = ?"));
        assert!(compiled.sql.contains("`users`.`name` = ?"));
        assert_eq!(
            compiled.parameters,
            vec![BindValue::Integer(5), BindValue::Text("ada".to_string())]
        );
    }

    #[test]
    fn test_compile_offset_without_limit() {
        let query = users::table.select(users::id).offset(10);
        let compiled = D1QueryCompiler.compile(&query).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT `users`.`id` FROM `users` LIMIT -1  OFFSET ?"
        );
        assert_eq!(compiled.parameters, vec![BindValue::Integer(10)]);
    }

    #[test]
    fn test_compile_limit_offset() {
        let query = users::table.select(users::id).limit(5).offset(10);
        let compiled = D1QueryCompiler.compile(&query).unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT `users`.`id` FROM `users` LIMIT ? OFFSET ?"
        );
        assert_eq!(
            compiled.parameters,
            vec![BindValue::Integer(5), BindValue::Integer(10)]
        );
    }

    #[test]
    fn test_compile_insert_with_null() {
        let query = diesel::insert_into(users::table)
            .values((users::name.eq("ada"), users::email.eq(None::<String>)));
        let compiled = D1QueryCompiler.compile(&query).unwrap();
        assert_eq!(
            compiled.sql,
            "INSERT INTO `users` (`name`, `email`) VALUES (?, ?)"
        );
        assert_eq!(
            compiled.parameters,
            vec![BindValue::Text("ada".to_string()), BindValue::Null]
        );
    }

    #[test]
    fn test_raw() {
        let compiled = CompiledQuery::raw("SELECT ?", vec![BindValue::Integer(1)]);
        assert_eq!(compiled.sql, "SELECT ?");
        assert_eq!(compiled.parameters.len(), 1);
    }
}

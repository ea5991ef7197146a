//! Row type handed to Diesel when loading query results
//!
//! Columns keep the order in which D1 returned them, which is the order of the
//! SELECT list. Diesel reads typed selects by position and `QueryableByName`
//! structs by name; both are supported. A name repeated in the SELECT list (as in
//! a join) resolves to its first occurrence.

use std::sync::Arc;

use diesel::row::{Field, PartialRow, Row, RowIndex, RowSealed};
use serde_json::Value as JsonValue;

use crate::{backend::D1Backend, store::D1Record, value::D1Value};

/// A row from a D1 query result
#[derive(Debug, Clone)]
pub struct D1Row {
    names: Arc<[String]>,
    values: Vec<JsonValue>,
}

impl D1Row {
    /// A row of `values` under column `names`, shared by every row of a result
    pub(crate) fn new(names: Arc<[String]>, values: Vec<JsonValue>) -> Self {
        Self { names, values }
    }
}

impl From<D1Record> for D1Row {
    fn from(record: D1Record) -> Self {
        let (names, values): (Vec<String>, Vec<JsonValue>) = record.into_iter().unzip();
        Self::new(names.into(), values)
    }
}

impl RowSealed for D1Row {}

impl<'stmt> Row<'stmt, D1Backend> for D1Row {
    type Field<'f> = D1Field<'f> where 'stmt: 'f, Self: 'f;
    type InnerPartialRow = Self;

    fn field_count(&self) -> usize {
        self.values.len()
    }

    fn get<'b, I>(&'b self, idx: I) -> Option<Self::Field<'b>>
    where
        'stmt: 'b,
        Self: RowIndex<I>,
    {
        let index = self.idx(idx)?;
        Some(D1Field {
            name: self.names.get(index)?,
            value: self.values.get(index)?,
        })
    }

    fn partial_row(&self, range: std::ops::Range<usize>) -> PartialRow<'_, Self::InnerPartialRow> {
        PartialRow::new(self, range)
    }
}

impl RowIndex<usize> for D1Row {
    fn idx(&self, idx: usize) -> Option<usize> {
        (idx < self.values.len()).then_some(idx)
    }
}

impl<'a> RowIndex<&'a str> for D1Row {
    fn idx(&self, field: &'a str) -> Option<usize> {
        self.names.iter().position(|name| name == field)
    }
}

/// A field from a D1 row
pub struct D1Field<'a> {
    name: &'a str,
    value: &'a JsonValue,
}

impl<'a> Field<'a, D1Backend> for D1Field<'a> {
    fn field_name(&self) -> Option<&str> {
        Some(self.name)
    }

    fn value(&self) -> Option<D1Value<'_>> {
        if self.value.is_null() {
            None
        } else {
            Some(D1Value::new(self.value))
        }
    }
}

//! SQL type implementations for D1 backend
//!
//! This module provides type mappings between Diesel SQL types and D1 types.

use diesel::{
    deserialize::{self, FromSql},
    serialize::{self, IsNull, Output, ToSql},
    sql_types::{self, HasSqlType},
};

use crate::{
    backend::{D1Backend, D1Type},
    bind_collector::BindValue,
    value::D1Value,
};

// Boolean
impl HasSqlType<sql_types::Bool> for D1Backend {
    fn metadata(_lookup: &mut ()) -> D1Type {
        D1Type::Integer
    }
}

impl FromSql<sql_types::Bool, D1Backend> for bool {
    fn from_sql(value: D1Value<'_>) -> deserialize::Result<Self> {
        match value.read_integer() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(format!("Invalid boolean value: {}", value.as_json()).into()),
        }
    }
}

impl ToSql<sql_types::Bool, D1Backend> for bool {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, D1Backend>) -> serialize::Result {
        out.set_value(BindValue::Integer(if *self { 1 } else { 0 }));
        Ok(IsNull::No)
    }
}

// SMALL INT
impl HasSqlType<sql_types::SmallInt> for D1Backend {
    fn metadata(_lookup: &mut ()) -> D1Type {
        D1Type::Integer
    }
}

impl FromSql<sql_types::SmallInt, D1Backend> for i16 {
    fn from_sql(value: D1Value<'_>) -> deserialize::Result<Self> {
        let num = read_integer(value)?;
        Ok(i16::try_from(num)?)
    }
}

impl ToSql<sql_types::SmallInt, D1Backend> for i16 {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, D1Backend>) -> serialize::Result {
        out.set_value(BindValue::Integer(*self as i64));
        Ok(IsNull::No)
    }
}

// Int
impl HasSqlType<sql_types::Integer> for D1Backend {
    fn metadata(_lookup: &mut ()) -> D1Type {
        D1Type::Integer
    }
}

impl FromSql<sql_types::Integer, D1Backend> for i32 {
    fn from_sql(value: D1Value<'_>) -> deserialize::Result<Self> {
        let num = read_integer(value)?;
        Ok(i32::try_from(num)?)
    }
}

impl ToSql<sql_types::Integer, D1Backend> for i32 {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, D1Backend>) -> serialize::Result {
        out.set_value(BindValue::Integer(*self as i64));
        Ok(IsNull::No)
    }
}

// BigInt
impl HasSqlType<sql_types::BigInt> for D1Backend {
    fn metadata(_lookup: &mut ()) -> D1Type {
        D1Type::Integer
    }
}

impl FromSql<sql_types::BigInt, D1Backend> for i64 {
    fn from_sql(value: D1Value<'_>) -> deserialize::Result<Self> {
        read_integer(value)
    }
}

impl ToSql<sql_types::BigInt, D1Backend> for i64 {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, D1Backend>) -> serialize::Result {
        out.set_value(BindValue::Integer(*self));
        Ok(IsNull::No)
    }
}

// Float
impl HasSqlType<sql_types::Float> for D1Backend {
    fn metadata(_lookup: &mut ()) -> D1Type {
        D1Type::Double
    }
}

impl FromSql<sql_types::Float, D1Backend> for f32 {
    fn from_sql(value: D1Value<'_>) -> deserialize::Result<Self> {
        Ok(read_number(value)? as f32)
    }
}

impl ToSql<sql_types::Float, D1Backend> for f32 {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, D1Backend>) -> serialize::Result {
        out.set_value(BindValue::Double(*self as f64));
        Ok(IsNull::No)
    }
}

// Double
impl HasSqlType<sql_types::Double> for D1Backend {
    fn metadata(_lookup: &mut ()) -> D1Type {
        D1Type::Double
    }
}

impl FromSql<sql_types::Double, D1Backend> for f64 {
    fn from_sql(value: D1Value<'_>) -> deserialize::Result<Self> {
        read_number(value)
    }
}

impl ToSql<sql_types::Double, D1Backend> for f64 {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, D1Backend>) -> serialize::Result {
        out.set_value(BindValue::Double(*self));
        Ok(IsNull::No)
    }
}

// Text
impl HasSqlType<sql_types::Text> for D1Backend {
    fn metadata(_lookup: &mut ()) -> D1Type {
        D1Type::Text
    }
}

impl FromSql<sql_types::Text, D1Backend> for String {
    fn from_sql(value: D1Value<'_>) -> deserialize::Result<Self> {
        Ok(value.read_string())
    }
}

impl ToSql<sql_types::Text, D1Backend> for str {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, D1Backend>) -> serialize::Result {
        out.set_value(BindValue::Text(self.to_string()));
        Ok(IsNull::No)
    }
}

// Blob/Binary
impl HasSqlType<sql_types::Binary> for D1Backend {
    fn metadata(_lookup: &mut ()) -> D1Type {
        D1Type::Binary
    }
}

impl FromSql<sql_types::Binary, D1Backend> for Vec<u8> {
    fn from_sql(value: D1Value<'_>) -> deserialize::Result<Self> {
        value
            .read_blob()
            .ok_or_else(|| format!("Invalid blob value: {}", value.as_json()).into())
    }
}

impl ToSql<sql_types::Binary, D1Backend> for [u8] {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, D1Backend>) -> serialize::Result {
        out.set_value(BindValue::Binary(self.to_vec()));
        Ok(IsNull::No)
    }
}

// Time-related types (stored as text in SQLite/D1)
impl HasSqlType<sql_types::Date> for D1Backend {
    fn metadata(_lookup: &mut ()) -> D1Type {
        D1Type::Text
    }
}

impl HasSqlType<sql_types::Time> for D1Backend {
    fn metadata(_lookup: &mut ()) -> D1Type {
        D1Type::Text
    }
}

impl HasSqlType<sql_types::Timestamp> for D1Backend {
    fn metadata(_lookup: &mut ()) -> D1Type {
        D1Type::Text
    }
}

fn read_number(value: D1Value<'_>) -> deserialize::Result<f64> {
    value
        .read_number()
        .ok_or_else(|| format!("Invalid number value: {}", value.as_json()).into())
}

fn read_integer(value: D1Value<'_>) -> deserialize::Result<i64> {
    value
        .read_integer()
        .ok_or_else(|| format!("Invalid integer value: {}", value.as_json()).into())
}

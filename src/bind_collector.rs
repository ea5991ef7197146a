//! Bind collector for D1 backend
//!
//! Diesel hands every bound value to the collector in statement order; the collected
//! [`BindValue`]s become the positional parameters of a [`crate::CompiledQuery`].

use base64::{engine::general_purpose::STANDARD, Engine as _};
use diesel::{
    query_builder::BindCollector,
    serialize::{IsNull, Output},
    sql_types::HasSqlType,
};
use serde::{Serialize, Serializer};

use crate::backend::{D1Backend, D1Type};

/// Collected bind values for a query
#[derive(Default, Clone)]
pub struct D1BindCollector {
    /// The collected bind values with their types
    pub binds: Vec<(BindValue, D1Type)>,
}

impl D1BindCollector {
    /// Drop the type metadata and keep the values in order
    pub fn into_values(self) -> Vec<BindValue> {
        self.binds.into_iter().map(|(value, _)| value).collect()
    }
}

/// A positional parameter sent to D1
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    /// Null value
    Null,
    /// Integer value
    Integer(i64),
    /// Double/float value
    Double(f64),
    /// Text value
    Text(String),
    /// Binary data
    Binary(Vec<u8>),
}

impl BindValue {
    /// Convert to the JSON value used on the wire
    ///
    /// Non-finite doubles have no JSON representation and are sent as null.
    /// Binary data is sent as base64 text.
    pub fn to_json_value(&self) -> serde_json::Value {
        match self {
            BindValue::Null => serde_json::Value::Null,
            BindValue::Integer(i) => serde_json::Value::Number((*i).into()),
            BindValue::Double(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            BindValue::Text(s) => serde_json::Value::String(s.clone()),
            BindValue::Binary(b) => serde_json::Value::String(STANDARD.encode(b)),
        }
    }
}

impl Serialize for BindValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}

impl From<i64> for BindValue {
    fn from(v: i64) -> Self {
        BindValue::Integer(v)
    }
}

impl From<i32> for BindValue {
    fn from(v: i32) -> Self {
        BindValue::Integer(v as i64)
    }
}

impl From<f64> for BindValue {
    fn from(v: f64) -> Self {
        BindValue::Double(v)
    }
}

impl From<bool> for BindValue {
    fn from(v: bool) -> Self {
        BindValue::Integer(v as i64)
    }
}

impl From<String> for BindValue {
    fn from(v: String) -> Self {
        BindValue::Text(v)
    }
}

impl From<&str> for BindValue {
    fn from(v: &str) -> Self {
        BindValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for BindValue {
    fn from(v: Vec<u8>) -> Self {
        BindValue::Binary(v)
    }
}

impl<T: Into<BindValue>> From<Option<T>> for BindValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(BindValue::Null)
    }
}

impl<'bind> BindCollector<'bind, D1Backend> for D1BindCollector {
    type Buffer = BindValue;

    fn push_bound_value<T, U>(
        &mut self,
        bind: &'bind U,
        metadata_lookup: &mut <D1Backend as diesel::sql_types::TypeMetadata>::MetadataLookup,
    ) -> diesel::QueryResult<()>
    where
        D1Backend: diesel::backend::Backend + diesel::sql_types::HasSqlType<T>,
        U: diesel::serialize::ToSql<T, D1Backend> + ?Sized + 'bind,
    {
        let mut to_sql_output = Output::new(BindValue::Null, metadata_lookup);
        let is_null = bind
            .to_sql(&mut to_sql_output)
            .map_err(diesel::result::Error::SerializationError)?;

        let bind = match is_null {
            IsNull::No => to_sql_output.into_inner(),
            IsNull::Yes => BindValue::Null,
        };

        let metadata = <D1Backend as diesel::sql_types::HasSqlType<T>>::metadata(metadata_lookup);
        self.binds.push((bind, metadata));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::sql_types::{Integer, Nullable, Text};

    #[test]
    fn test_to_json_value() {
        assert_eq!(BindValue::Null.to_json_value(), serde_json::Value::Null);
        assert_eq!(BindValue::Integer(42).to_json_value(), serde_json::json!(42));
        assert_eq!(BindValue::Text("hi".into()).to_json_value(), serde_json::json!("hi"));
        assert_eq!(BindValue::Double(1.5).to_json_value(), serde_json::json!(1.5));
    }

    #[test]
    fn test_non_finite_double_is_null() {
        assert_eq!(BindValue::Double(f64::NAN).to_json_value(), serde_json::Value::Null);
    }

    #[test]
    fn test_binary_is_base64() {
        let value = BindValue::Binary(b"hello".to_vec());
        assert_eq!(value.to_json_value(), serde_json::json!("aGVsbG8="));
    }

    #[test]
    fn test_serialize_matches_json_value() {
        let params = vec![BindValue::Integer(1), BindValue::Null, "x".into()];
        let encoded = serde_json::to_string(&params).unwrap();
        assert_eq!(encoded, r#"[1,null,"x"]"#);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(BindValue::from(Some(3i64)), BindValue::Integer(3));
        assert_eq!(BindValue::from(None::<String>), BindValue::Null);
    }

    #[test]
    fn test_collector_keeps_order_and_nulls() {
        let mut collector = D1BindCollector::default();
        collector
            .push_bound_value::<Integer, _>(&5i32, &mut ())
            .unwrap();
        collector
            .push_bound_value::<Nullable<Text>, _>(&None::<String>, &mut ())
            .unwrap();
        collector
            .push_bound_value::<Text, _>("name", &mut ())
            .unwrap();

        assert_eq!(collector.binds[0].1, D1Type::Integer);
        assert_eq!(
            collector.into_values(),
            vec![
                BindValue::Integer(5),
                BindValue::Null,
                BindValue::Text("name".to_string())
            ]
        );
    }
}

//! Raw column values read back from D1
//!
//! D1 returns rows as JSON objects, so a raw value is a borrowed JSON value plus a
//! few lenient readers used by the `FromSql` implementations.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value as JsonValue;

/// A single non-null column value from a D1 result row
#[derive(Debug, Clone, Copy)]
pub struct D1Value<'a> {
    value: &'a JsonValue,
}

impl<'a> D1Value<'a> {
    pub(crate) fn new(value: &'a JsonValue) -> Self {
        Self { value }
    }

    /// The underlying JSON value
    pub fn as_json(&self) -> &'a JsonValue {
        self.value
    }

    /// Read the value as a string
    pub(crate) fn read_string(&self) -> String {
        match self.value {
            JsonValue::String(s) => s.clone(),
            JsonValue::Number(n) => n.to_string(),
            JsonValue::Bool(b) => b.to_string(),
            JsonValue::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Read the value as a number (f64)
    ///
    /// Numeric text is accepted since SQLite columns have no strict types.
    pub(crate) fn read_number(&self) -> Option<f64> {
        match self.value {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            JsonValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Read the value as a 64-bit integer without going through f64 when possible
    pub(crate) fn read_integer(&self) -> Option<i64> {
        match self.value {
            JsonValue::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            JsonValue::String(s) => s.parse().ok(),
            JsonValue::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Read the value as a blob
    ///
    /// D1 returns blobs as arrays of byte values; base64 text is accepted too.
    pub(crate) fn read_blob(&self) -> Option<Vec<u8>> {
        match self.value {
            JsonValue::String(s) => STANDARD.decode(s).ok(),
            JsonValue::Array(arr) => arr
                .iter()
                .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect(),
            _ => None,
        }
    }
}

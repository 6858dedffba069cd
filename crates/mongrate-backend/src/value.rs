//! Dynamic row values.
//!
//! Source rows are heterogeneous column-to-value maps; embedding turns them
//! into nested documents and lists. [`Value`] is the tagged variant threaded
//! through child-row assembly, and [`Row`] preserves column order.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;

/// An order-preserving column-to-value map.
pub type Row = IndexMap<String, Value>;

/// One dynamically typed cell, document, or list.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Decimal(BigDecimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// A nested (embedded) document
    Document(Row),
    /// A list of values, typically embedded documents
    Array(Vec<Value>),
}

impl Value {
    /// NULL and nothing else; absent children embed as `Null` too.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Render for preview output. Scalars map onto JSON; decimals, dates,
    /// and byte strings fall back to their textual representation.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::UInt(u) => Json::from(*u),
            Value::Double(d) => serde_json::Number::from_f64(*d)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Text(s) => Json::String(s.clone()),
            Value::Bytes(b) => Json::String(String::from_utf8_lossy(b).into_owned()),
            Value::Decimal(d) => Json::String(d.to_string()),
            Value::Date(d) => Json::String(d.to_string()),
            Value::DateTime(dt) => Json::String(dt.to_string()),
            Value::Document(row) => Json::Object(
                row.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

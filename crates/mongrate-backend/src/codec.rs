//! Persistence-time value transforms.
//!
//! Applied when a row is turned into a target document: arbitrary-precision
//! decimals are promoted to the target's 128-bit decimal and plain dates to
//! a datetime at midnight. Unrecognized shapes pass through untouched.

use std::str::FromStr;

use bson::{Bson, Document};
use chrono::{NaiveDateTime, NaiveTime};
use tracing::warn;

use crate::value::{Row, Value};

/// Convert a row into a target document, applying the codec transforms.
pub fn row_to_document(row: &Row) -> Document {
    let mut doc = Document::new();
    for (column, value) in row {
        doc.insert(column.clone(), value_to_bson(value));
    }
    doc
}

/// Convert one value, recursing through documents and lists.
pub fn value_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Int(i) => Bson::Int64(*i),
        Value::UInt(u) => {
            if *u <= i64::MAX as u64 {
                Bson::Int64(*u as i64)
            } else {
                Bson::Double(*u as f64)
            }
        }
        Value::Double(d) => Bson::Double(*d),
        Value::Text(s) => Bson::String(s.clone()),
        Value::Bytes(b) => Bson::Binary(bson::Binary {
            subtype: bson::spec::BinarySubtype::Generic,
            bytes: b.clone(),
        }),
        Value::Decimal(d) => match bson::Decimal128::from_str(&d.to_string()) {
            Ok(decimal) => Bson::Decimal128(decimal),
            Err(_) => {
                warn!(value = %d, "decimal outside Decimal128 range, storing as text");
                Bson::String(d.to_string())
            }
        },
        Value::Date(d) => datetime_bson(d.and_time(NaiveTime::MIN)),
        Value::DateTime(dt) => datetime_bson(*dt),
        Value::Document(row) => Bson::Document(row_to_document(row)),
        Value::Array(items) => Bson::Array(items.iter().map(value_to_bson).collect()),
    }
}

fn datetime_bson(dt: NaiveDateTime) -> Bson {
    Bson::DateTime(bson::DateTime::from_millis(
        dt.and_utc().timestamp_millis(),
    ))
}

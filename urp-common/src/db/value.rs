//! Row values returned by the database collaborator
//!
//! A row is an ordered map from column name to a tagged scalar, so encoders can
//! work over any column set without a fixed struct per query.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// One result row, columns in select order
pub type Row = IndexMap<String, SqlValue>;

/// A single column value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Json(serde_json::Value),
}

impl SqlValue {
    /// Plain-text rendering used for CSV cells
    ///
    /// Null renders as the empty string, JSON as compact JSON text, temporal
    /// values in the same ISO 8601 form as the JSON encoding.
    pub fn to_text(&self) -> String {
        match self {
            SqlValue::Null => String::new(),
            SqlValue::Bool(b) => b.to_string(),
            SqlValue::Int(i) => i.to_string(),
            SqlValue::Float(f) => f.to_string(),
            SqlValue::Text(s) => s.clone(),
            SqlValue::Json(v) => v.to_string(),
            temporal => temporal.temporal_text().unwrap_or_default(),
        }
    }

    fn temporal_text(&self) -> Option<String> {
        match self {
            SqlValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            SqlValue::Time(t) => Some(t.format("%H:%M:%S%.f").to_string()),
            SqlValue::Timestamp(ts) => Some(ts.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()),
            SqlValue::TimestampTz(ts) => Some(ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            _ => None,
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SqlValue::Null => serializer.serialize_unit(),
            SqlValue::Bool(b) => serializer.serialize_bool(*b),
            SqlValue::Int(i) => serializer.serialize_i64(*i),
            SqlValue::Float(f) => serializer.serialize_f64(*f),
            SqlValue::Text(s) => serializer.serialize_str(s),
            SqlValue::Json(v) => v.serialize(serializer),
            temporal => serializer.serialize_str(&temporal.temporal_text().unwrap_or_default()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

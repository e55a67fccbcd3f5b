//! Coerced output values

use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::fmt;
use sttm_schema::DestinationKind;

/// A value coerced to one of the destination kinds
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Float(f64),
    Integer(i64),
    List(Vec<Value>),
    /// Distinct elements in first-seen order
    Set(Vec<Value>),
    Mapping(Map<String, Value>),
}

impl FieldValue {
    /// Destination kind this value belongs to
    pub fn kind(&self) -> DestinationKind {
        match self {
            Self::String(_) => DestinationKind::String,
            Self::Float(_) => DestinationKind::Float,
            Self::Integer(_) => DestinationKind::Integer,
            Self::List(_) => DestinationKind::List,
            Self::Set(_) => DestinationKind::Set,
            Self::Mapping(_) => DestinationKind::Mapping,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert to a JSON value. Sets become arrays.
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Integer(i) => Value::Number((*i).into()),
            Self::List(items) | Self::Set(items) => Value::Array(items.clone()),
            Self::Mapping(members) => Value::Object(members.clone()),
        }
    }

    /// Textual view used by transform masks and flat outputs
    pub fn to_text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Float(f) => format_float(*f),
            Self::Integer(i) => i.to_string(),
            other => other.to_json().to_string(),
        }
    }
}

/// Render a float the way JSON does, keeping a fractional part (`3.0`)
pub(crate) fn format_float(f: f64) -> String {
    Number::from_f64(f).map_or_else(|| f.to_string(), |n| n.to_string())
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

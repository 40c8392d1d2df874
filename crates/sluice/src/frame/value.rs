//! Cell value and column type definitions.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Declared data type for a ledger column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// 64-bit signed integers.
    Int,
    /// 64-bit floating-point numbers.
    Float,
    /// Boolean values.
    Bool,
    /// UTF-8 strings.
    Str,
    /// Milliseconds since the Unix epoch, UTC.
    Timestamp,
    /// Ordered list of values.
    List,
    /// Named composite value, used for intermediate producer outputs.
    Struct,
}

impl ColumnType {
    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::Str => "str",
            ColumnType::Timestamp => "timestamp",
            ColumnType::List => "list",
            ColumnType::Struct => "struct",
        };
        f.write_str(name)
    }
}

/// A single cell value.
///
/// Nulls are represented as `Option<Value>` at the column layer, never as a
/// sentinel variant here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// Milliseconds since the Unix epoch, UTC.
    Timestamp(i64),
    List(Vec<Value>),
    Struct(IndexMap<String, Value>),
}

impl Value {
    /// The column type this value belongs to.
    pub fn dtype(&self) -> ColumnType {
        match self {
            Value::Int(_) => ColumnType::Int,
            Value::Float(_) => ColumnType::Float,
            Value::Bool(_) => ColumnType::Bool,
            Value::Str(_) => ColumnType::Str,
            Value::Timestamp(_) => ColumnType::Timestamp,
            Value::List(_) => ColumnType::List,
            Value::Struct(_) => ColumnType::Struct,
        }
    }

    /// Build a timestamp value from a chrono datetime.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Value::Timestamp(dt.timestamp_millis())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    /// Look up a field of a struct value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Compare two values of the same type. Int and Float compare
    /// numerically across the pair; everything else only against itself.
    pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
            (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
            (Value::Int(x), Value::Float(y)) => (*x as f64).partial_cmp(y),
            (Value::Float(x), Value::Int(y)) => x.partial_cmp(&(*y as f64)),
            (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
            (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
            (Value::Timestamp(x), Value::Timestamp(y)) => Some(x.cmp(y)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Str(v) => f.write_str(v),
            Value::Timestamp(ms) => match DateTime::<Utc>::from_timestamp_millis(*ms) {
                Some(dt) => write!(f, "{}", dt.to_rfc3339()),
                None => write!(f, "{}ms", ms),
            },
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Struct(fields) => {
                write!(f, "{{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_comparison_crosses_int_and_float() {
        assert_eq!(
            Value::compare(&Value::Int(2), &Value::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::compare(&Value::Float(3.0), &Value::Int(3)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_mismatched_types_do_not_compare() {
        assert_eq!(
            Value::compare(&Value::Str("a".into()), &Value::Int(1)),
            None
        );
        assert_eq!(
            Value::compare(&Value::Timestamp(0), &Value::Int(0)),
            None
        );
    }

    #[test]
    fn test_struct_field_access() {
        let mut fields = IndexMap::new();
        fields.insert("size".to_string(), Value::Int(42));
        let v = Value::Struct(fields);
        assert_eq!(v.field("size"), Some(&Value::Int(42)));
        assert_eq!(v.field("missing"), None);
    }

    #[test]
    fn test_timestamp_display_is_rfc3339() {
        let v = Value::from_datetime(DateTime::from_timestamp_millis(0).unwrap());
        assert_eq!(v.to_string(), "1970-01-01T00:00:00+00:00");
    }
}

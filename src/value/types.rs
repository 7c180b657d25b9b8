//! The dynamic value carried by rows, parameters and hints.
//!
//! Every value a repository method binds or returns passes through [`Value`]. Values
//! compare across numeric variants (`Int`, `Float`, `Decimal`) so that a parameter bound
//! as `2` matches a stored `2.0`, which is what enum resolution and condition evaluation
//! both rely on.

use crate::value::Row;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// A dynamically typed value.
///
/// Serialized untagged, so hand-written definition files can use plain literals
/// (`id = 2`, `name = "open"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Row(Row),
    Decimal(Decimal),
    Uuid(Uuid),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Row(_) => "row",
            Value::Decimal(_) => "decimal",
            Value::Uuid(_) => "uuid",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_row(&self) -> Option<&Row> {
        match self {
            Value::Row(row) => Some(row),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Ordering between two values of comparable kinds.
    ///
    /// Numeric variants compare with each other; text, dates, timestamps, uuids and booleans
    /// compare within their own kind. Anything else (including `Null`) is unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Decimal(b)) => Some(Decimal::from(*a).cmp(b)),
            (Value::Decimal(a), Value::Int(b)) => Some(a.cmp(&Decimal::from(*b))),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// Equality that treats numerically equal values of different variants as equal.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        match self.compare(other) {
            Some(ordering) => ordering == Ordering::Equal,
            None => self == other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "'{s}'"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Row(row) => write!(f, "{row}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::DateTime(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

macro_rules! impl_from_value {
    ($type:ty, $variant:ident) => {
        impl From<$type> for Value {
            fn from(v: $type) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_from_value!(bool, Bool);
impl_from_value!(i64, Int);
impl_from_value!(f64, Float);
impl_from_value!(String, Text);
impl_from_value!(Decimal, Decimal);
impl_from_value!(Uuid, Uuid);
impl_from_value!(NaiveDate, Date);
impl_from_value!(DateTime<Utc>, DateTime);
impl_from_value!(Row, Row);

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_numeric_cross_comparison() {
        assert_eq!(Value::Int(2).compare(&Value::Float(2.0)), Some(Ordering::Equal));
        assert_eq!(
            Value::Decimal(Decimal::from_str("1.5").unwrap()).compare(&Value::Int(2)),
            Some(Ordering::Less)
        );
        assert!(Value::Int(2).loosely_equals(&Value::Decimal(Decimal::from(2))));
    }

    #[test]
    fn test_incomparable_kinds() {
        assert_eq!(Value::Text("a".into()).compare(&Value::Int(1)), None);
        assert_eq!(Value::Null.compare(&Value::Null), None);
        assert!(Value::Null.loosely_equals(&Value::Null));
    }

    #[test]
    fn test_display() {
        let v: Value = vec![1i64, 2].into();
        assert_eq!(v.to_string(), "[1, 2]");
        assert_eq!(Value::from("open").to_string(), "'open'");
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_untagged_literals_deserialize() {
        let v: Value = serde_json::from_str("2").unwrap();
        assert_eq!(v, Value::Int(2));
        let v: Value = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(v, Value::Text("x".to_string()));
        let v: Value = serde_json::from_str("[true, null]").unwrap();
        assert_eq!(v, Value::List(vec![Value::Bool(true), Value::Null]));
    }
}

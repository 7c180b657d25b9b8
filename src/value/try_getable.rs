//! TryGetable trait for safe value extraction
//!
//! Materialized rows hand back [`Value`]s; `TryGetable` turns them into concrete Rust types
//! with an error that distinguishes a null value from a type mismatch.

use crate::value::{Row, Value};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Error type for value extraction failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueExtractionError {
    #[error("Value is null")]
    NullValue,
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("Conversion error: {0}")]
    ConversionError(String),
    #[error("Property not found: {0}")]
    MissingProperty(String),
}

/// Trait for safe value extraction with error handling
pub trait TryGetable: Sized {
    /// Extract from an owned value.
    ///
    /// - `Ok(T)` if the value matches the expected type and is not null
    /// - `Err(NullValue)` if the value is null
    /// - `Err(TypeMismatch)` if the value type doesn't match
    fn try_get(value: Value) -> Result<Self, ValueExtractionError>;

    /// Like [`try_get`](Self::try_get), but maps null to `Ok(None)`.
    fn try_get_opt(value: Value) -> Result<Option<Self>, ValueExtractionError> {
        match Self::try_get(value) {
            Ok(v) => Ok(Some(v)),
            Err(ValueExtractionError::NullValue) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

macro_rules! impl_try_getable {
    ($type:ty, $variant:ident, $expected:expr) => {
        impl TryGetable for $type {
            fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    Value::Null => Err(ValueExtractionError::NullValue),
                    other => Err(ValueExtractionError::TypeMismatch {
                        expected: $expected.to_string(),
                        actual: other.type_name().to_string(),
                    }),
                }
            }
        }
    };
}

impl_try_getable!(bool, Bool, "bool");
impl_try_getable!(i64, Int, "int");
impl_try_getable!(String, Text, "text");
impl_try_getable!(Decimal, Decimal, "decimal");
impl_try_getable!(Uuid, Uuid, "uuid");
impl_try_getable!(NaiveDate, Date, "date");
impl_try_getable!(DateTime<Utc>, DateTime, "datetime");
impl_try_getable!(Row, Row, "row");
impl_try_getable!(Vec<Value>, List, "list");

impl TryGetable for i32 {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        let wide = i64::try_get(value)?;
        i32::try_from(wide)
            .map_err(|_| ValueExtractionError::ConversionError(format!("{wide} does not fit in i32")))
    }
}

impl TryGetable for u64 {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        let wide = i64::try_get(value)?;
        u64::try_from(wide)
            .map_err(|_| ValueExtractionError::ConversionError(format!("{wide} is negative")))
    }
}

impl TryGetable for f64 {
    fn try_get(value: Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::Null => Err(ValueExtractionError::NullValue),
            other => Err(ValueExtractionError::TypeMismatch {
                expected: "float".to_string(),
                actual: other.type_name().to_string(),
            }),
        }
    }
}

impl Row {
    /// Extract a typed property (dotted paths allowed).
    pub fn try_get<T: TryGetable>(&self, property: &str) -> Result<T, ValueExtractionError> {
        let value = self
            .get_path(property)
            .cloned()
            .ok_or_else(|| ValueExtractionError::MissingProperty(property.to_string()))?;
        T::try_get(value)
    }
}

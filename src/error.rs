//! Error types for repository method compilation and invocation.
//!
//! Errors fall into three groups:
//!
//! - [`ConfigError`] - the method declaration cannot be compiled. These surface when the
//!   repository is built (or on first use of a lazily compiled method) and never reach the
//!   backend.
//! - [`QueryError`] - a single invocation failed. Callers branch on `NoResult`,
//!   `AmbiguousResult` and `Precondition`; `Backend` is an opaque pass-through.
//! - [`BackendError`] - reported by a [`LoadBackend`](crate::backend::LoadBackend) or a
//!   [`FetchPlanResolver`](crate::backend::FetchPlanResolver).

use crate::method::SpecialKind;
use thiserror::Error;

/// A method declaration that cannot be compiled into a query descriptor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("method `{method}`: entity `{entity}` is not registered in the metadata")]
    UnknownEntity { method: String, entity: String },

    #[error("method `{method}`: invalid method name: {reason}")]
    InvalidMethodName { method: String, reason: String },

    #[error("method `{method}`: `{prefix}` queries are not supported by the query compiler")]
    UnsupportedQueryKind { method: String, prefix: String },

    #[error("method `{method}`: no property of `{entity}` matches `{words}`")]
    UnknownProperty {
        method: String,
        entity: String,
        words: String,
    },

    #[error("method `{method}`: `{words}` is ambiguous, it matches {candidates:?}")]
    AmbiguousPropertyPath {
        method: String,
        words: String,
        candidates: Vec<String>,
    },

    #[error("method `{method}`: query text references `{placeholder}` which matches no parameter")]
    UnboundPlaceholder { method: String, placeholder: String },

    #[error("method `{method}`: placeholder `{placeholder}` refers to {kind} parameter #{index}, which cannot be bound")]
    SpecialParameterPlaceholder {
        method: String,
        placeholder: String,
        kind: SpecialKind,
        index: usize,
    },

    #[error("method `{method}`: more than one {kind} parameter (positions {first} and {second})")]
    DuplicateSpecialParameter {
        method: String,
        kind: SpecialKind,
        first: usize,
        second: usize,
    },

    #[error("method `{method}`: parameter name `{name}` is declared more than once")]
    DuplicateParameterName { method: String, name: String },

    #[error("method `{method}`: name declares {expected} parameter placeholder(s) but the signature has {actual} bindable parameter(s)")]
    ParameterCountMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("method `{method}`: parameter #{index} is used with `{operator}` and must be a collection")]
    CollectionParameterRequired {
        method: String,
        index: usize,
        operator: String,
    },

    #[error("method `{method}`: page or slice return type requires a page request parameter")]
    MissingPageParameter { method: String },

    #[error("method `{method}`: unsupported return shape: {reason}")]
    UnsupportedShape { method: String, reason: String },

    #[error("enum `{name}` is not registered in the metadata")]
    UnknownEnum { name: String },

    #[error("enum `{name}` declares no variants")]
    EmptyEnum { name: String },

    #[error("enum `{name}` has no variant with id {value}")]
    UnknownEnumValue { name: String, value: String },
}

impl ConfigError {
    /// Name of the method the error was raised for, if it is method-scoped.
    pub fn method(&self) -> Option<&str> {
        match self {
            ConfigError::UnknownEntity { method, .. }
            | ConfigError::InvalidMethodName { method, .. }
            | ConfigError::UnsupportedQueryKind { method, .. }
            | ConfigError::UnknownProperty { method, .. }
            | ConfigError::AmbiguousPropertyPath { method, .. }
            | ConfigError::UnboundPlaceholder { method, .. }
            | ConfigError::SpecialParameterPlaceholder { method, .. }
            | ConfigError::DuplicateSpecialParameter { method, .. }
            | ConfigError::DuplicateParameterName { method, .. }
            | ConfigError::ParameterCountMismatch { method, .. }
            | ConfigError::CollectionParameterRequired { method, .. }
            | ConfigError::MissingPageParameter { method }
            | ConfigError::UnsupportedShape { method, .. } => Some(method),
            ConfigError::UnknownEnum { .. }
            | ConfigError::EmptyEnum { .. }
            | ConfigError::UnknownEnumValue { .. } => None,
        }
    }
}

/// Failure reported by a backend collaborator.
///
/// The message is kept as-is; the optional source carries the backend's own error type.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failure of a single repository method invocation.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The method could not be compiled, or a value could not be mapped to its declared type.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("repository has no method named `{0}`")]
    UnknownMethod(String),

    #[error("method `{method}`: no result found")]
    NoResult { method: String },

    #[error("method `{method}`: expected {expected} result, found {actual}")]
    AmbiguousResult {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("method `{method}`: {reason}")]
    Precondition { method: String, reason: String },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl QueryError {
    pub(crate) fn precondition(method: &str, reason: impl Into<String>) -> Self {
        QueryError::Precondition {
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    /// True for the "zero rows where exactly one was required" case.
    pub fn is_no_result(&self) -> bool {
        matches!(self, QueryError::NoResult { .. })
    }
}

//! # repoquery
//!
//! Compiles declarative repository method signatures into load specifications and shapes
//! the loaded rows into the declared return type.
//!
//! A method such as `findDistinctByStatusAndCreatedAfterOrderByCreatedDesc(status, after)`
//! is compiled once into a [`QueryDescriptor`]; each call then builds a fresh
//! [`LoadSpecification`], hands it to a [`LoadBackend`] and materializes the result as a
//! single item, an optional, a collection, a stream, a slice, a page, a count or a boolean.
//!
//! - [`metadata`] - entities, properties and enums methods may reference
//! - [`method`] - method signatures as declared by the caller
//! - [`query`] - compilation, load specifications and result materialization
//! - [`backend`] - the collaborators a repository loads through
//! - [`repository`] - the facade tying it together

pub mod backend;
pub mod config;
pub mod error;
pub mod metadata;
pub mod method;
pub mod metrics;
pub mod query;
pub mod repository;
pub mod value;

pub use backend::{FetchPlanRegistry, FetchPlanResolver, InMemoryBackend, LoadBackend, LoadInterceptor, QueryTextHook};
pub use config::RepositoryConfig;
pub use error::{BackendError, ConfigError, QueryError};
pub use metadata::Metadata;
pub use method::MethodSignature;
pub use query::{
    Argument, FetchPlan, Item, LoadSpecification, Page, PageRequest, QueryContext, QueryDescriptor, QueryResult,
    Slice, Sort,
};
pub use repository::{Repository, RepositoryBuilder};
pub use value::{Row, Value};

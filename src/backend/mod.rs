//! Collaborators a repository loads through.
//!
//! - **`LoadBackend`** - executes load specifications and returns rows or counts
//! - **`FetchPlanResolver`** - turns a fetch plan name into the properties to load
//! - **`QueryTextHook`** - rewrites hand-written query text once, at compile time
//! - **`LoadInterceptor`** - inspects or adjusts every specification before it is loaded
//!
//! [`InMemoryBackend`] is a complete reference backend over in-memory rows.

pub mod eval;
pub mod memory;

pub use memory::InMemoryBackend;

use crate::error::BackendError;
use crate::query::descriptor::QueryDescriptor;
use crate::query::spec::{FetchPlan, LoadSpecification};
use crate::value::Row;
use std::collections::BTreeMap;

/// Name of the fetch plan that loads an entity with its default properties.
pub const BASE_FETCH_PLAN: &str = "_base";

/// Data-loading backend.
///
/// Implementations must be shareable between threads; a repository calls them from any
/// thread that invokes a method.
pub trait LoadBackend: Send + Sync {
    /// Load the rows a specification selects.
    ///
    /// # Arguments
    ///
    /// * `spec` - Entity, conditions, parameter values, sort, pagination and fetch plan
    ///
    /// # Returns
    ///
    /// Returns the selected rows in sort order, at most `spec.pagination.limit` of them.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the load fails. The error reaches the caller unchanged.
    fn execute(&self, spec: &LoadSpecification) -> Result<Vec<Row>, BackendError>;

    /// Count the rows a specification selects.
    ///
    /// # Returns
    ///
    /// Returns the number of matching rows, capped at `spec.pagination.limit` when one is
    /// set. A cap of one lets existence checks stop at the first match.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the count fails.
    fn count(&self, spec: &LoadSpecification) -> Result<u64, BackendError>;
}

/// Resolves fetch plan names.
pub trait FetchPlanResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns `BackendError` when `plan` is not known for `entity`.
    fn resolve(&self, entity: &str, plan: &str) -> Result<FetchPlan, BackendError>;
}

/// Resolver that accepts every name and loads default properties for all of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughResolver;

impl FetchPlanResolver for PassthroughResolver {
    fn resolve(&self, _entity: &str, plan: &str) -> Result<FetchPlan, BackendError> {
        Ok(FetchPlan::named(plan))
    }
}

/// Fetch plans registered per entity.
///
/// [`BASE_FETCH_PLAN`] always resolves, to a plan with no property restriction.
#[derive(Debug, Clone, Default)]
pub struct FetchPlanRegistry {
    plans: BTreeMap<(String, String), Vec<String>>,
}

impl FetchPlanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<I, S>(mut self, entity: impl Into<String>, plan: impl Into<String>, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plans.insert(
            (entity.into(), plan.into()),
            properties.into_iter().map(Into::into).collect(),
        );
        self
    }
}

impl FetchPlanResolver for FetchPlanRegistry {
    fn resolve(&self, entity: &str, plan: &str) -> Result<FetchPlan, BackendError> {
        match self.plans.get(&(entity.to_string(), plan.to_string())) {
            Some(properties) => Ok(FetchPlan::named(plan).with_properties(properties.iter().cloned())),
            None if plan == BASE_FETCH_PLAN => Ok(FetchPlan::named(plan)),
            None => Err(BackendError::new(format!(
                "fetch plan `{plan}` is not registered for `{entity}`"
            ))),
        }
    }
}

/// Rewrites hand-written query text, for example to expand macros or add tenant filters.
///
/// Hooks run once per method at compile time, in registration order, before placeholders
/// are bound.
pub trait QueryTextHook: Send + Sync {
    fn rewrite(&self, text: &str, entity: &str) -> String;
}

/// Called with every load specification right before it reaches the backend.
pub trait LoadInterceptor: Send + Sync {
    fn before_load(&self, descriptor: &QueryDescriptor, spec: &mut LoadSpecification);
}

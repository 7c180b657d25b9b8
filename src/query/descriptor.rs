//! Compiled query descriptors.
//!
//! A [`QueryDescriptor`] holds everything about a method that does not depend on the
//! arguments of a call. It is built once per method and then shared read-only through
//! `Arc`; per-call state lives in a fresh [`LoadSpecification`](crate::query::spec::LoadSpecification).

use crate::backend::QueryTextHook;
use crate::error::ConfigError;
use crate::metadata::Metadata;
use crate::method::{MethodSignature, ParamDecl};
use crate::query::condition::Condition;
use crate::query::derived;
use crate::query::params::{self, SpecialParameters};
use crate::query::shape::{self, ReturnShape, ShapeContext};
use crate::query::spec::Order;
use crate::query::template;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    Find,
    Count,
    Exists,
}

/// Where the filter of a method comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySource {
    /// Condition derived from the method name; `None` loads everything.
    Derived { condition: Option<Arc<Condition>> },
    /// Hand-written query text, already rewritten by the text hooks and normalized to
    /// `:name` placeholders.
    Template { text: String },
}

/// Which builder turns the descriptor into a load specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuilderVariant {
    Structured,
    Template,
    Count,
    ListWithStaticSort,
}

/// Binding of a placeholder name to a zero-based argument index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterBinding {
    pub name: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    method: String,
    entity: String,
    kind: QueryKind,
    source: QuerySource,
    distinct: bool,
    max_results: Option<u64>,
    static_sort: Vec<Order>,
    special: SpecialParameters,
    bindings: Vec<ParameterBinding>,
    parameter_count: usize,
    properties: Vec<String>,
    fetch_plan: Option<String>,
    hints: BTreeMap<String, Value>,
    shape: ReturnShape,
    variant: BuilderVariant,
}

impl QueryDescriptor {
    /// Compiles a method signature.
    ///
    /// # Arguments
    ///
    /// * `signature` - The declared method
    /// * `metadata` - Entities and enums the method may reference
    /// * `hooks` - Rewrites applied in order to hand-written query text before binding
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for anything that makes the declaration unusable; nothing is
    /// deferred to call time.
    pub fn compile(
        signature: &MethodSignature,
        metadata: &Metadata,
        hooks: &[Arc<dyn QueryTextHook>],
    ) -> Result<Self, ConfigError> {
        let method = signature.name.as_str();
        let entity = metadata
            .get_entity(&signature.entity)
            .ok_or_else(|| ConfigError::UnknownEntity {
                method: method.to_string(),
                entity: signature.entity.clone(),
            })?;

        let index = params::resolve(&signature.params);
        if let Some(duplicate) = index.duplicates.first() {
            return Err(ConfigError::DuplicateSpecialParameter {
                method: method.to_string(),
                kind: duplicate.kind,
                first: duplicate.first,
                second: duplicate.second,
            });
        }

        let bindable: Vec<(usize, &ParamDecl)> = index
            .bindable
            .iter()
            .map(|&i| (i, &signature.params[i]))
            .collect();
        let mut seen = BTreeSet::new();
        for (_, param) in &bindable {
            if let Some(name) = param.binding_name() {
                if !seen.insert(name) {
                    return Err(ConfigError::DuplicateParameterName {
                        method: method.to_string(),
                        name: name.to_string(),
                    });
                }
            }
        }

        let annotations = &signature.annotations;
        let (kind, source, distinct, max_results, derived_sort, bindings) = match &annotations.query {
            Some(text) => {
                let rewritten = hooks
                    .iter()
                    .fold(text.clone(), |text, hook| hook.rewrite(&text, &entity.name));
                let bound = template::bind(method, &rewritten, &signature.params, &index)?;
                (
                    QueryKind::Find,
                    QuerySource::Template { text: bound.text },
                    false,
                    None,
                    Vec::new(),
                    bound.bindings,
                )
            }
            None => {
                let compiled = derived::compile(method, metadata, entity, &bindable)?;
                let bindings = bindable
                    .iter()
                    .zip(compiled.parameter_names)
                    .map(|((index, _), name)| ParameterBinding { name, index: *index })
                    .collect();
                (
                    compiled.kind,
                    QuerySource::Derived {
                        condition: compiled.condition.map(Arc::new),
                    },
                    compiled.distinct,
                    compiled.max_results,
                    compiled.sort,
                    bindings,
                )
            }
        };

        let shape = shape::resolve(
            &signature.returns,
            &ShapeContext {
                method,
                kind,
                properties: &annotations.properties,
                has_page_parameter: index.special.page.is_some(),
                metadata,
            },
        )?;

        let mut static_sort: Vec<Order> = Vec::new();
        for order in annotations.sort.iter().chain(&derived_sort) {
            if !static_sort.iter().any(|o| o.property == order.property) {
                static_sort.push(order.clone());
            }
        }

        let variant = match (&source, kind) {
            (QuerySource::Template { .. }, _) => BuilderVariant::Template,
            (_, QueryKind::Count | QueryKind::Exists) => BuilderVariant::Count,
            _ if !annotations.sort.is_empty() => BuilderVariant::ListWithStaticSort,
            _ => BuilderVariant::Structured,
        };

        let descriptor = Self {
            method: method.to_string(),
            entity: entity.name.clone(),
            kind,
            source,
            distinct,
            max_results,
            static_sort,
            special: index.special,
            bindings,
            parameter_count: signature.params.len(),
            properties: annotations.properties.clone(),
            fetch_plan: annotations.fetch_plan.clone(),
            hints: annotations.hints.clone(),
            shape,
            variant,
        };
        log::debug!(
            "compiled `{}` on `{}`: {:?} via {:?} builder, {} binding(s)",
            descriptor.method,
            descriptor.entity,
            descriptor.kind,
            descriptor.variant,
            descriptor.bindings.len()
        );
        Ok(descriptor)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn source(&self) -> &QuerySource {
        &self.source
    }

    /// Derived condition, if the method has one.
    pub fn condition(&self) -> Option<&Arc<Condition>> {
        match &self.source {
            QuerySource::Derived { condition } => condition.as_ref(),
            QuerySource::Template { .. } => None,
        }
    }

    pub fn query_text(&self) -> Option<&str> {
        match &self.source {
            QuerySource::Template { text } => Some(text),
            QuerySource::Derived { .. } => None,
        }
    }

    pub fn distinct(&self) -> bool {
        self.distinct
    }

    pub fn max_results(&self) -> Option<u64> {
        self.max_results
    }

    /// Annotation sort followed by name-derived sort.
    pub fn static_sort(&self) -> &[Order] {
        &self.static_sort
    }

    pub fn special(&self) -> &SpecialParameters {
        &self.special
    }

    pub fn bindings(&self) -> &[ParameterBinding] {
        &self.bindings
    }

    /// Placeholder names in binding order.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.bindings.iter().map(|b| b.name.as_str()).collect()
    }

    /// Number of declared parameters, special ones included.
    pub fn parameter_count(&self) -> usize {
        self.parameter_count
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    pub fn fetch_plan(&self) -> Option<&str> {
        self.fetch_plan.as_deref()
    }

    pub fn hints(&self) -> &BTreeMap<String, Value> {
        &self.hints
    }

    pub fn shape(&self) -> &ReturnShape {
        &self.shape
    }

    pub fn variant(&self) -> BuilderVariant {
        self.variant
    }

    /// Hexadecimal SHA-256 of the descriptor's JSON form.
    ///
    /// Structurally equal descriptors have equal fingerprints, so a fingerprint can be used
    /// to detect that a method compiles differently after a metadata or signature change.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let canonical = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{EntityMeta, PropertyMeta, ScalarType};
    use crate::method::{CollectionKind, ElementType, ParamType, ReturnType, SpecialKind};

    fn metadata() -> Metadata {
        Metadata::new().entity(
            EntityMeta::new("Order")
                .property(PropertyMeta::scalar("status", ScalarType::Text))
                .property(PropertyMeta::scalar("created", ScalarType::DateTime))
                .property(PropertyMeta::scalar("total", ScalarType::Decimal)),
        )
    }

    fn list() -> ReturnType {
        ReturnType::Collection {
            kind: CollectionKind::List,
            element: ElementType::Entity("Order".into()),
        }
    }

    fn text(name: &str) -> ParamDecl {
        ParamDecl::named(name, ParamType::Scalar(ScalarType::Text))
    }

    struct Upper;

    impl QueryTextHook for Upper {
        fn rewrite(&self, text: &str, _entity: &str) -> String {
            text.replace("where", "WHERE")
        }
    }

    struct Tenant;

    impl QueryTextHook for Tenant {
        fn rewrite(&self, text: &str, entity: &str) -> String {
            format!("{text} /* {entity} */")
        }
    }

    #[test]
    fn test_compile_example_method() {
        let sig = MethodSignature::new("Order", "findDistinctByStatusAndCreatedAfterOrderByCreatedDesc", list())
            .param(text("status"))
            .param(ParamDecl::named("after", ParamType::Scalar(ScalarType::DateTime)));
        let d = QueryDescriptor::compile(&sig, &metadata(), &[]).unwrap();
        assert!(d.distinct());
        assert_eq!(d.condition().unwrap().to_string(), "status = :status AND created > :after");
        assert_eq!(d.static_sort(), &[Order::desc("created")]);
        assert_eq!(d.parameter_names(), vec!["status", "after"]);
        assert_eq!(d.variant(), BuilderVariant::Structured);
    }

    #[test]
    fn test_bindings_skip_special_parameters() {
        let sig = MethodSignature::new("Order", "findByStatusAndTotalGreaterThan", ReturnType::Slice(ElementType::Entity("Order".into())))
            .param(text("status"))
            .param(ParamDecl::named("page", ParamType::Page))
            .param(ParamDecl::named("min", ParamType::Scalar(ScalarType::Decimal)));
        let d = QueryDescriptor::compile(&sig, &metadata(), &[]).unwrap();
        assert_eq!(
            d.bindings(),
            &[
                ParameterBinding { name: "status".into(), index: 0 },
                ParameterBinding { name: "min".into(), index: 2 },
            ]
        );
        assert_eq!(d.special().page, Some(1));
        assert_eq!(d.parameter_count(), 3);
    }

    #[test]
    fn test_static_sort_precedes_derived_sort() {
        let sig = MethodSignature::new("Order", "findByStatusOrderByCreatedDescTotalAsc", list())
            .param(text("status"))
            .sort(Order::asc("total"));
        let d = QueryDescriptor::compile(&sig, &metadata(), &[]).unwrap();
        assert_eq!(d.static_sort(), &[Order::asc("total"), Order::desc("created")]);
        assert_eq!(d.variant(), BuilderVariant::ListWithStaticSort);
    }

    #[test]
    fn test_template_hooks_run_in_order_before_binding() {
        let sig = MethodSignature::new("Order", "openOrders", list())
            .param(text("status"))
            .query("select o from Order o where o.status = ?1");
        let hooks: Vec<Arc<dyn QueryTextHook>> = vec![Arc::new(Upper), Arc::new(Tenant)];
        let d = QueryDescriptor::compile(&sig, &metadata(), &hooks).unwrap();
        assert_eq!(
            d.query_text(),
            Some("select o from Order o WHERE o.status = :status /* Order */")
        );
        assert_eq!(d.variant(), BuilderVariant::Template);
        assert!(d.condition().is_none());
    }

    #[test]
    fn test_count_and_exists_variant() {
        let sig = MethodSignature::new("Order", "existsByStatus", ReturnType::Boolean).param(text("s"));
        let d = QueryDescriptor::compile(&sig, &metadata(), &[]).unwrap();
        assert_eq!(d.kind(), QueryKind::Exists);
        assert_eq!(d.variant(), BuilderVariant::Count);
        assert_eq!(d.shape(), &ReturnShape::Exists);
    }

    #[test]
    fn test_duplicate_special_parameter() {
        let sig = MethodSignature::new("Order", "findByStatus", list())
            .param(ParamDecl::named("a", ParamType::FetchPlan))
            .param(text("status"))
            .param(ParamDecl::named("b", ParamType::FetchPlan));
        match QueryDescriptor::compile(&sig, &metadata(), &[]) {
            Err(ConfigError::DuplicateSpecialParameter { kind, first, second, .. }) => {
                assert_eq!((kind, first, second), (SpecialKind::FetchPlan, 0, 2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_parameter_names() {
        let sig = MethodSignature::new("Order", "findByStatusOrStatus", list())
            .param(text("status"))
            .param(text("other").with_alias("status"));
        assert!(matches!(
            QueryDescriptor::compile(&sig, &metadata(), &[]),
            Err(ConfigError::DuplicateParameterName { name, .. }) if name == "status"
        ));
    }

    #[test]
    fn test_unknown_entity() {
        let sig = MethodSignature::new("Invoice", "findAll", list());
        assert!(matches!(
            QueryDescriptor::compile(&sig, &metadata(), &[]),
            Err(ConfigError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn test_fingerprint_is_structural() {
        let sig = MethodSignature::new("Order", "findByStatus", list()).param(text("status"));
        let a = QueryDescriptor::compile(&sig, &metadata(), &[]).unwrap();
        let b = QueryDescriptor::compile(&sig, &metadata(), &[]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert_eq!(a.fingerprint().unwrap().len(), 64);

        let other = MethodSignature::new("Order", "findByStatusOrderByTotalAsc", list()).param(text("status"));
        let c = QueryDescriptor::compile(&other, &metadata(), &[]).unwrap();
        assert_ne!(a.fingerprint().unwrap(), c.fingerprint().unwrap());
    }
}

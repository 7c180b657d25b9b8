//! Per-call load specification builders.
//!
//! Every invocation turns the cached [`QueryDescriptor`] and the live arguments into a
//! fresh [`LoadSpecification`]. The descriptor picks the builder; all builders share the
//! argument checks, hint merging, runtime sort, pagination and fetch plan resolution.

use crate::backend::FetchPlanResolver;
use crate::config::RepositoryConfig;
use crate::error::QueryError;
use crate::query::descriptor::{BuilderVariant, QueryDescriptor, QueryKind};
use crate::query::spec::{
    Argument, FetchPlan, LoadMode, LoadSpecification, Order, PageRequest, Pagination, QueryContext, Sort,
};
use crate::value::Value;
use std::sync::Arc;

/// Collaborators a builder may consult.
pub struct BuildContext<'a> {
    pub resolver: &'a dyn FetchPlanResolver,
    pub config: &'a RepositoryConfig,
}

pub trait SpecBuilder: Send + Sync {
    /// Builds the load specification for one call.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Precondition` when the arguments do not fit the declaration, and
    /// `QueryError::Backend` when the fetch plan cannot be resolved.
    fn build(
        &self,
        descriptor: &QueryDescriptor,
        args: &[Argument],
        cx: &BuildContext<'_>,
    ) -> Result<LoadSpecification, QueryError>;
}

/// Derived condition plus named values.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredBuilder;

/// Hand-written query text plus named values.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateBuilder;

/// Counting form of a structured load; existence checks stop at the first row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountBuilder;

/// Structured load whose annotation-declared sort always leads.
///
/// The ordering comes from [`QueryDescriptor::compile`], which stores annotation orders
/// ahead of name-derived ones in `static_sort()`; this builder then runs the structured
/// pipeline, where runtime orders can only follow.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSortBuilder;

static STRUCTURED: StructuredBuilder = StructuredBuilder;
static TEMPLATE: TemplateBuilder = TemplateBuilder;
static COUNT: CountBuilder = CountBuilder;
static STATIC_SORT: StaticSortBuilder = StaticSortBuilder;

/// Builder for a descriptor's variant.
pub fn for_variant(variant: BuilderVariant) -> &'static dyn SpecBuilder {
    match variant {
        BuilderVariant::Structured => &STRUCTURED,
        BuilderVariant::Template => &TEMPLATE,
        BuilderVariant::Count => &COUNT,
        BuilderVariant::ListWithStaticSort => &STATIC_SORT,
    }
}

impl SpecBuilder for StructuredBuilder {
    fn build(
        &self,
        descriptor: &QueryDescriptor,
        args: &[Argument],
        cx: &BuildContext<'_>,
    ) -> Result<LoadSpecification, QueryError> {
        let call = CallArguments::extract(descriptor, args)?;
        let mut spec = base_spec(descriptor, &call, cx);
        spec.conditions.extend(descriptor.condition().cloned());
        add_context(&mut spec, &call);
        spec.sort = merged_sort(descriptor.static_sort(), &call);
        spec.pagination = pagination(descriptor, &call)?;
        spec.fetch_plan = Some(fetch_plan(descriptor, &call, cx)?);
        log_spec(descriptor, &spec);
        Ok(spec)
    }
}

impl SpecBuilder for StaticSortBuilder {
    fn build(
        &self,
        descriptor: &QueryDescriptor,
        args: &[Argument],
        cx: &BuildContext<'_>,
    ) -> Result<LoadSpecification, QueryError> {
        StructuredBuilder.build(descriptor, args, cx)
    }
}

impl SpecBuilder for TemplateBuilder {
    fn build(
        &self,
        descriptor: &QueryDescriptor,
        args: &[Argument],
        cx: &BuildContext<'_>,
    ) -> Result<LoadSpecification, QueryError> {
        let call = CallArguments::extract(descriptor, args)?;
        let mut spec = base_spec(descriptor, &call, cx);
        spec.query_text = descriptor.query_text().map(str::to_string);
        add_context(&mut spec, &call);
        spec.sort = merged_sort(descriptor.static_sort(), &call);
        spec.pagination = pagination(descriptor, &call)?;
        spec.fetch_plan = Some(fetch_plan(descriptor, &call, cx)?);
        log_spec(descriptor, &spec);
        Ok(spec)
    }
}

impl SpecBuilder for CountBuilder {
    fn build(
        &self,
        descriptor: &QueryDescriptor,
        args: &[Argument],
        cx: &BuildContext<'_>,
    ) -> Result<LoadSpecification, QueryError> {
        let call = CallArguments::extract(descriptor, args)?;
        let mut spec = base_spec(descriptor, &call, cx);
        spec.conditions.extend(descriptor.condition().cloned());
        add_context(&mut spec, &call);
        spec.mode = LoadMode::Count;
        if descriptor.kind() == QueryKind::Exists {
            spec.pagination.limit = Some(1);
        }
        log_spec(descriptor, &spec);
        Ok(spec)
    }
}

/// Special and bound arguments of one call, checked against the declaration.
struct CallArguments<'a> {
    page: Option<&'a PageRequest>,
    sort: Option<&'a Sort>,
    fetch_plan: Option<&'a FetchPlan>,
    context: Option<&'a QueryContext>,
    values: Vec<(String, Value)>,
}

impl<'a> CallArguments<'a> {
    fn extract(descriptor: &QueryDescriptor, args: &'a [Argument]) -> Result<Self, QueryError> {
        let method = descriptor.method();
        if args.len() != descriptor.parameter_count() {
            return Err(QueryError::precondition(
                method,
                format!(
                    "expected {} argument(s), got {}",
                    descriptor.parameter_count(),
                    args.len()
                ),
            ));
        }
        let special = descriptor.special();
        let mismatch = |index: usize, expected: &str| {
            QueryError::precondition(
                method,
                format!(
                    "argument #{index} must be a {expected}, got {}",
                    args[index].kind_name()
                ),
            )
        };

        let page = match special.page.map(|i| (i, &args[i])) {
            None | Some((_, Argument::Absent)) => None,
            Some((_, Argument::Page(page))) => Some(page),
            Some((i, _)) => return Err(mismatch(i, "page request")),
        };
        let sort = match special.sort.map(|i| (i, &args[i])) {
            None | Some((_, Argument::Absent)) => None,
            Some((_, Argument::Sort(sort))) => Some(sort),
            Some((i, _)) => return Err(mismatch(i, "sort")),
        };
        let fetch_plan = match special.fetch_plan.map(|i| (i, &args[i])) {
            None | Some((_, Argument::Absent)) => None,
            Some((_, Argument::FetchPlan(plan))) => Some(plan),
            Some((i, _)) => return Err(mismatch(i, "fetch plan")),
        };
        let context = match special.context.map(|i| (i, &args[i])) {
            None | Some((_, Argument::Absent)) => None,
            Some((_, Argument::Context(context))) => Some(context),
            Some((i, _)) => return Err(mismatch(i, "query context")),
        };

        let mut values = Vec::with_capacity(descriptor.bindings().len());
        for binding in descriptor.bindings() {
            let value = match &args[binding.index] {
                Argument::Value(value) => value.clone(),
                Argument::Absent => Value::Null,
                _ => return Err(mismatch(binding.index, "value")),
            };
            values.push((binding.name.clone(), value));
        }

        Ok(Self {
            page,
            sort,
            fetch_plan,
            context,
            values,
        })
    }
}

fn base_spec(descriptor: &QueryDescriptor, call: &CallArguments<'_>, cx: &BuildContext<'_>) -> LoadSpecification {
    let mut spec = LoadSpecification::new(descriptor.entity());
    spec.distinct = descriptor.distinct();
    spec.properties = descriptor.properties().to_vec();
    spec.parameters = call.values.iter().cloned().collect();

    for (name, value) in &cx.config.default_hints {
        spec.hints.insert(name.clone(), Value::Text(value.clone()));
    }
    for (name, value) in descriptor.hints() {
        spec.hints.insert(name.clone(), value.clone());
    }
    if let Some(context) = call.context {
        for (name, value) in &context.hints {
            spec.hints.insert(name.clone(), value.clone());
        }
    }
    spec
}

/// ANDs the ad-hoc context condition after the compiled one. Context parameters never
/// replace a value bound from a method argument.
fn add_context(spec: &mut LoadSpecification, call: &CallArguments<'_>) {
    let Some(context) = call.context else {
        return;
    };
    if let Some(condition) = &context.condition {
        spec.conditions.push(Arc::new(condition.clone()));
    }
    for (name, value) in &context.parameters {
        spec.parameters
            .entry(name.clone())
            .or_insert_with(|| value.clone());
    }
}

/// Static orders, then the sort argument, then the page request's sort. A runtime order on
/// a property that is already sorted is dropped.
fn merged_sort(static_sort: &[Order], call: &CallArguments<'_>) -> Vec<Order> {
    let runtime = call
        .sort
        .into_iter()
        .flat_map(|s| &s.orders)
        .chain(call.page.into_iter().flat_map(|p| &p.sort.orders));

    let mut sort = static_sort.to_vec();
    for order in runtime {
        if !sort.iter().any(|o| o.property == order.property) {
            sort.push(order.clone());
        }
    }
    sort
}

fn pagination(descriptor: &QueryDescriptor, call: &CallArguments<'_>) -> Result<Pagination, QueryError> {
    let looks_ahead = descriptor.shape().looks_ahead();
    if looks_ahead && call.page.is_none() {
        return Err(QueryError::precondition(
            descriptor.method(),
            "a page request argument is required",
        ));
    }
    match call.page.and_then(|page| page.size.map(|size| (page, size))) {
        Some((page, size)) => Ok(Pagination {
            offset: page.offset(),
            limit: Some(if looks_ahead { size.saturating_add(1) } else { size }),
        }),
        None => Ok(Pagination {
            offset: 0,
            limit: descriptor.max_results(),
        }),
    }
}

/// Call argument, else the method's declared plan, else the configured default.
fn fetch_plan(
    descriptor: &QueryDescriptor,
    call: &CallArguments<'_>,
    cx: &BuildContext<'_>,
) -> Result<FetchPlan, QueryError> {
    if let Some(plan) = call.fetch_plan {
        if !plan.properties.is_empty() {
            return Ok(plan.clone());
        }
        return Ok(cx.resolver.resolve(descriptor.entity(), &plan.name)?);
    }
    let name = descriptor
        .fetch_plan()
        .unwrap_or(cx.config.default_fetch_plan.as_str());
    Ok(cx.resolver.resolve(descriptor.entity(), name)?)
}

fn log_spec(descriptor: &QueryDescriptor, spec: &LoadSpecification) {
    log::debug!(
        "`{}`: {} condition(s), {} parameter(s), sort {:?}, {:?}, {:?}",
        descriptor.method(),
        spec.conditions.len(),
        spec.parameters.len(),
        spec.sort.iter().map(ToString::to_string).collect::<Vec<_>>(),
        spec.pagination,
        spec.mode
    );
}

//! Load specifications and the call-time argument types that feed them.
//!
//! A [`LoadSpecification`] is built fresh for every invocation and handed to the backend.
//! It is never cached or shared between calls; the conditions it references from the
//! compiled descriptor are shared through `Arc` rather than copied.

use crate::query::condition::Condition;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    #[serde(default)]
    pub direction: Direction,
}

impl Order {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Asc => write!(f, "{} ASC", self.property),
            Direction::Desc => write!(f, "{} DESC", self.property),
        }
    }
}

/// Runtime sort argument.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sort {
    pub orders: Vec<Order>,
}

impl Sort {
    pub fn by(orders: impl IntoIterator<Item = Order>) -> Self {
        Self {
            orders: orders.into_iter().collect(),
        }
    }

    pub fn unsorted() -> Self {
        Self::default()
    }
}

/// Runtime page request. A request without a size is unpaged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageRequest {
    /// Zero-based page number.
    pub page: u64,
    pub size: Option<u64>,
    pub sort: Sort,
}

impl PageRequest {
    pub fn of(page: u64, size: u64) -> Self {
        Self {
            page,
            size: Some(size),
            sort: Sort::default(),
        }
    }

    pub fn unpaged() -> Self {
        Self::default()
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn is_paged(&self) -> bool {
        self.size.is_some()
    }

    pub fn offset(&self) -> u64 {
        self.size.map_or(0, |size| self.page.saturating_mul(size))
    }
}

/// Resolved fetch profile: which properties of the object graph to load.
///
/// An empty property list means "everything the backend loads by default".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchPlan {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<String>,
}

impl FetchPlan {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn with_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = properties.into_iter().map(Into::into).collect();
        self
    }
}

/// Ad-hoc query context passed as a special argument.
///
/// Its condition is ANDed with the method's own condition; its parameters feed that
/// condition; its hints override method-level hints.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryContext {
    pub condition: Option<Condition>,
    pub parameters: BTreeMap<String, Value>,
    pub hints: BTreeMap<String, Value>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn hint(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.hints.insert(name.into(), value.into());
        self
    }
}

/// One actual argument of an invocation, positionally aligned with the declared parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Value(Value),
    Page(PageRequest),
    Sort(Sort),
    FetchPlan(FetchPlan),
    Context(QueryContext),
    /// No value supplied (a null reference in the caller's terms).
    Absent,
}

impl Argument {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Argument::Value(_) => "value",
            Argument::Page(_) => "page request",
            Argument::Sort(_) => "sort",
            Argument::FetchPlan(_) => "fetch plan",
            Argument::Context(_) => "query context",
            Argument::Absent => "absent",
        }
    }
}

macro_rules! impl_value_argument {
    ($($type:ty),* $(,)?) => {
        $(
            impl From<$type> for Argument {
                fn from(value: $type) -> Self {
                    Argument::Value(value.into())
                }
            }
        )*
    };
}

impl_value_argument!(
    Value,
    bool,
    i32,
    i64,
    f64,
    &str,
    String,
    rust_decimal::Decimal,
    uuid::Uuid,
    chrono::NaiveDate,
    chrono::DateTime<chrono::Utc>,
    crate::value::Row,
    Vec<Value>,
);

impl From<PageRequest> for Argument {
    fn from(page: PageRequest) -> Self {
        Argument::Page(page)
    }
}

impl From<Sort> for Argument {
    fn from(sort: Sort) -> Self {
        Argument::Sort(sort)
    }
}

impl From<FetchPlan> for Argument {
    fn from(plan: FetchPlan) -> Self {
        Argument::FetchPlan(plan)
    }
}

impl From<QueryContext> for Argument {
    fn from(context: QueryContext) -> Self {
        Argument::Context(context)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub offset: u64,
    pub limit: Option<u64>,
}

/// Whether the backend should return rows or only count them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    #[default]
    Rows,
    Count,
}

/// Everything the backend needs for one load.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadSpecification {
    pub entity: String,
    /// Literal query text for hand-written queries; `None` for structured loads.
    pub query_text: Option<String>,
    /// Conjunction: every condition must hold. Compiled conditions come first.
    pub conditions: Vec<Arc<Condition>>,
    pub parameters: BTreeMap<String, Value>,
    pub hints: BTreeMap<String, Value>,
    pub fetch_plan: Option<FetchPlan>,
    pub sort: Vec<Order>,
    pub distinct: bool,
    pub pagination: Pagination,
    pub mode: LoadMode,
    /// Declared result properties for projections; empty for entity loads.
    pub properties: Vec<String>,
}

impl LoadSpecification {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            ..Self::default()
        }
    }

    /// All conditions folded into a single tree, for display and for backends that want one.
    pub fn merged_condition(&self) -> Option<Condition> {
        match self.conditions.as_slice() {
            [] => None,
            [only] => Some(only.as_ref().clone()),
            many => Some(Condition::and(
                many.iter().map(|c| c.as_ref().clone()).collect(),
            )),
        }
    }

    /// Counting form of this specification: same conditions, parameters, fetch plan and
    /// distinct flag, no sort, no pagination. Distinct counts compare rows after the same
    /// projection the load applies.
    pub fn to_count(&self) -> LoadSpecification {
        LoadSpecification {
            entity: self.entity.clone(),
            query_text: self.query_text.clone(),
            conditions: self.conditions.clone(),
            parameters: self.parameters.clone(),
            hints: self.hints.clone(),
            fetch_plan: self.fetch_plan.clone(),
            sort: Vec::new(),
            distinct: self.distinct,
            pagination: Pagination::default(),
            mode: LoadMode::Count,
            properties: self.properties.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::condition::Operator;

    #[test]
    fn test_page_offset() {
        assert_eq!(PageRequest::of(3, 20).offset(), 60);
        assert_eq!(PageRequest::unpaged().offset(), 0);
        assert!(!PageRequest::unpaged().is_paged());
    }

    #[test]
    fn test_argument_conversions() {
        assert_eq!(Argument::from("x"), Argument::Value(Value::from("x")));
        assert_eq!(Argument::from(PageRequest::of(0, 5)).kind_name(), "page request");
    }

    #[test]
    fn test_to_count_drops_paging_and_sort_keeps_projection() {
        let mut spec = LoadSpecification::new("Order");
        spec.conditions.push(Arc::new(Condition::leaf("status", Operator::Equal, ["status"])));
        spec.sort.push(Order::desc("created"));
        spec.pagination = Pagination {
            offset: 10,
            limit: Some(11),
        };
        spec.distinct = true;
        spec.fetch_plan = Some(FetchPlan::named("summary").with_properties(["status"]));
        let count = spec.to_count();
        assert_eq!(count.mode, LoadMode::Count);
        assert_eq!(count.fetch_plan, spec.fetch_plan);
        assert!(count.sort.is_empty());
        assert_eq!(count.pagination, Pagination::default());
        assert!(count.distinct);
        assert!(Arc::ptr_eq(&count.conditions[0], &spec.conditions[0]));
    }

    #[test]
    fn test_merged_condition() {
        let mut spec = LoadSpecification::new("Order");
        assert!(spec.merged_condition().is_none());
        spec.conditions.push(Arc::new(Condition::leaf("a", Operator::Equal, ["a"])));
        spec.conditions.push(Arc::new(Condition::leaf("b", Operator::IsNull, Vec::<String>::new())));
        assert_eq!(
            spec.merged_condition().unwrap().to_string(),
            "a = :a AND b IS NULL"
        );
    }
}

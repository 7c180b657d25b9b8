//! Declared repository method signatures.
//!
//! A [`MethodSignature`] is the input to the query compiler: the method name (which may
//! carry the derived-name grammar), the ordered parameter declarations, the declared
//! return type and the method-level annotations.

use crate::metadata::ScalarType;
use crate::query::spec::Order;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Recognized kinds of special (non-bindable) parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialKind {
    Page,
    Sort,
    FetchPlan,
    Context,
}

impl SpecialKind {
    pub const ALL: [SpecialKind; 4] = [
        SpecialKind::Page,
        SpecialKind::Sort,
        SpecialKind::FetchPlan,
        SpecialKind::Context,
    ];
}

impl fmt::Display for SpecialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpecialKind::Page => "page request",
            SpecialKind::Sort => "sort",
            SpecialKind::FetchPlan => "fetch plan",
            SpecialKind::Context => "query context",
        };
        f.write_str(name)
    }
}

/// Declared type of a method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Scalar(ScalarType),
    Enum(String),
    Entity(String),
    Collection,
    Page,
    Sort,
    FetchPlan,
    Context,
}

impl ParamType {
    pub fn special_kind(&self) -> Option<SpecialKind> {
        match self {
            ParamType::Page => Some(SpecialKind::Page),
            ParamType::Sort => Some(SpecialKind::Sort),
            ParamType::FetchPlan => Some(SpecialKind::FetchPlan),
            ParamType::Context => Some(SpecialKind::Context),
            ParamType::Scalar(_)
            | ParamType::Enum(_)
            | ParamType::Entity(_)
            | ParamType::Collection => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, ParamType::Collection)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    #[serde(default)]
    pub name: Option<String>,
    /// Explicit binding name; takes precedence over `name`.
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(rename = "type")]
    pub ty: ParamType,
}

impl ParamDecl {
    pub fn named(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: Some(name.into()),
            alias: None,
            ty,
        }
    }

    pub fn anonymous(ty: ParamType) -> Self {
        Self {
            name: None,
            alias: None,
            ty,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name the parameter binds under: alias, else declared name.
    pub fn binding_name(&self) -> Option<&str> {
        self.alias.as_deref().or(self.name.as_deref())
    }
}

/// Concrete collection type a method declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    List,
    /// Duplicate-free; iteration order unspecified.
    Set,
    /// Duplicate-free, keeps row order.
    LinkedSet,
    /// Any other declared collection type, by name.
    Custom(String),
}

/// Element type inside a declared return type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Entity(String),
    Scalar(ScalarType),
    Enum(String),
    /// Generic key/value projection over the declared result properties.
    KeyValue,
}

/// Declared return type of a repository method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    Single(ElementType),
    Optional(ElementType),
    Collection {
        kind: CollectionKind,
        element: ElementType,
    },
    Stream(ElementType),
    Slice(ElementType),
    Page(ElementType),
    /// Integer count.
    Count,
    Boolean,
}

/// Method-level annotations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MethodAnnotations {
    /// Hand-written query text; the method name grammar is ignored when present.
    #[serde(default)]
    pub query: Option<String>,
    /// Fetch plan name used when no fetch plan argument is supplied.
    #[serde(default)]
    pub fetch_plan: Option<String>,
    #[serde(default)]
    pub hints: BTreeMap<String, Value>,
    /// Result properties for scalar and key/value projections.
    #[serde(default)]
    pub properties: Vec<String>,
    /// Static sort that always precedes name-derived and runtime orders.
    #[serde(default)]
    pub sort: Vec<Order>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub entity: String,
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    pub returns: ReturnType,
    #[serde(default)]
    pub annotations: MethodAnnotations,
}

impl MethodSignature {
    pub fn new(entity: impl Into<String>, name: impl Into<String>, returns: ReturnType) -> Self {
        Self {
            entity: entity.into(),
            name: name.into(),
            params: Vec::new(),
            returns,
            annotations: MethodAnnotations::default(),
        }
    }

    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    pub fn query(mut self, text: impl Into<String>) -> Self {
        self.annotations.query = Some(text.into());
        self
    }

    pub fn fetch_plan(mut self, name: impl Into<String>) -> Self {
        self.annotations.fetch_plan = Some(name.into());
        self
    }

    pub fn hint(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.annotations.hints.insert(name.into(), value.into());
        self
    }

    pub fn properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.annotations.properties = properties.into_iter().map(Into::into).collect();
        self
    }

    pub fn sort(mut self, order: Order) -> Self {
        self.annotations.sort.push(order);
        self
    }
}

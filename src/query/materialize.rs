//! Turning loaded rows into the declared result shape.
//!
//! The materializer only looks at the [`ReturnShape`] resolved at compile time. Cardinality
//! rules live here: a single result must be exactly one row, an optional result at most
//! one, and a slice knows whether another page follows from the extra row the builder asked
//! the backend for.

use crate::error::{ConfigError, QueryError};
use crate::metadata::{EnumVariant, Metadata};
use crate::query::descriptor::QueryDescriptor;
use crate::query::shape::{CollectionShape, Element, ReturnShape};
use crate::query::spec::PageRequest;
use crate::value::{Row, Value};

/// One materialized element.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Entity(Row),
    Scalar(Value),
    Enum(EnumVariant),
    KeyValue(Row),
}

impl Item {
    pub fn as_row(&self) -> Option<&Row> {
        match self {
            Item::Entity(row) | Item::KeyValue(row) => Some(row),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Item::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumVariant> {
        match self {
            Item::Enum(variant) => Some(variant),
            _ => None,
        }
    }
}

/// One page of results without a total count.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice<T> {
    pub content: Vec<T>,
    pub number: u64,
    /// Requested page size; `None` when the request was unpaged.
    pub size: Option<u64>,
    pub has_next: bool,
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub number: u64,
    pub size: Option<u64>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        match self.size {
            Some(0) | None => 1,
            Some(size) => self.total.div_ceil(size),
        }
    }

    pub fn has_next(&self) -> bool {
        self.number + 1 < self.total_pages()
    }
}

/// Single-pass sequence of results. Consuming it is the only way to read it.
#[derive(Debug)]
pub struct ItemStream {
    items: std::vec::IntoIter<Item>,
}

impl Iterator for ItemStream {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

#[derive(Debug)]
pub enum QueryResult {
    Single(Item),
    Optional(Option<Item>),
    Collection { kind: CollectionShape, items: Vec<Item> },
    Stream(ItemStream),
    Slice(Slice<Item>),
    Page(Page<Item>),
    Count(u64),
    Exists(bool),
}

impl QueryResult {
    pub fn into_single(self) -> Option<Item> {
        match self {
            QueryResult::Single(item) => Some(item),
            _ => None,
        }
    }

    pub fn into_optional(self) -> Option<Option<Item>> {
        match self {
            QueryResult::Optional(item) => Some(item),
            _ => None,
        }
    }

    /// Items of a collection, stream, slice or page.
    pub fn into_items(self) -> Option<Vec<Item>> {
        match self {
            QueryResult::Collection { items, .. } => Some(items),
            QueryResult::Stream(stream) => Some(stream.collect()),
            QueryResult::Slice(slice) => Some(slice.content),
            QueryResult::Page(page) => Some(page.content),
            _ => None,
        }
    }

    pub fn into_stream(self) -> Option<ItemStream> {
        match self {
            QueryResult::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn into_slice(self) -> Option<Slice<Item>> {
        match self {
            QueryResult::Slice(slice) => Some(slice),
            _ => None,
        }
    }

    pub fn into_page(self) -> Option<Page<Item>> {
        match self {
            QueryResult::Page(page) => Some(page),
            _ => None,
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            QueryResult::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn exists(&self) -> Option<bool> {
        match self {
            QueryResult::Exists(b) => Some(*b),
            _ => None,
        }
    }
}

/// What the backend produced for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Rows {
        rows: Vec<Row>,
        /// Page request of the call, for slices and pages.
        page: Option<PageRequest>,
        /// Total matching rows, for pages.
        total: Option<u64>,
    },
    Count(u64),
}

pub struct ResultMaterializer<'a> {
    descriptor: &'a QueryDescriptor,
    metadata: &'a Metadata,
}

impl<'a> ResultMaterializer<'a> {
    pub fn new(descriptor: &'a QueryDescriptor, metadata: &'a Metadata) -> Self {
        Self { descriptor, metadata }
    }

    /// Shapes a load result into the method's declared return shape.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::NoResult` or `QueryError::AmbiguousResult` when a single or
    /// optional result gets the wrong number of rows, and `QueryError::Config` when an enum
    /// column holds an id that no variant declares.
    pub fn materialize(&self, loaded: Loaded) -> Result<QueryResult, QueryError> {
        let method = self.descriptor.method();
        let (rows, page, total) = match (self.descriptor.shape(), loaded) {
            (ReturnShape::Count, Loaded::Count(n)) => return Ok(QueryResult::Count(n)),
            (ReturnShape::Exists, Loaded::Count(n)) => return Ok(QueryResult::Exists(n > 0)),
            (_, Loaded::Rows { rows, page, total }) => (rows, page, total),
            (shape, Loaded::Count(_)) => {
                return Err(QueryError::precondition(
                    method,
                    format!("backend returned a count for a {shape:?} result"),
                ))
            }
        };

        match self.descriptor.shape() {
            ReturnShape::Single(element) => match rows.len() {
                0 => Err(QueryError::NoResult {
                    method: method.to_string(),
                }),
                1 => Ok(QueryResult::Single(self.convert(element, &rows[0])?)),
                n => Err(self.ambiguous(n)),
            },
            ReturnShape::Optional(element) => match rows.len() {
                0 => Ok(QueryResult::Optional(None)),
                1 => Ok(QueryResult::Optional(Some(self.convert(element, &rows[0])?))),
                n => Err(self.ambiguous(n)),
            },
            ReturnShape::Collection { kind, element } => {
                let mut items = self.convert_all(element, &rows)?;
                if kind.is_set() {
                    dedup_in_order(&mut items);
                }
                Ok(QueryResult::Collection { kind: *kind, items })
            }
            ReturnShape::Stream(element) => Ok(QueryResult::Stream(ItemStream {
                items: self.convert_all(element, &rows)?.into_iter(),
            })),
            ReturnShape::Slice(element) => {
                let page = page.unwrap_or_default();
                let (rows, has_next) = split_look_ahead(rows, page.size);
                Ok(QueryResult::Slice(Slice {
                    content: self.convert_all(element, &rows)?,
                    number: page.page,
                    size: page.size,
                    has_next,
                }))
            }
            ReturnShape::Page(element) => {
                let page = page.unwrap_or_default();
                let (rows, _) = split_look_ahead(rows, page.size);
                let total = match (page.size, total) {
                    (Some(_), Some(total)) => total,
                    _ => rows.len() as u64,
                };
                Ok(QueryResult::Page(Page {
                    content: self.convert_all(element, &rows)?,
                    number: page.page,
                    size: page.size,
                    total,
                }))
            }
            ReturnShape::Count => Ok(QueryResult::Count(rows.len() as u64)),
            ReturnShape::Exists => Ok(QueryResult::Exists(!rows.is_empty())),
        }
    }

    fn ambiguous(&self, actual: usize) -> QueryError {
        QueryError::AmbiguousResult {
            method: self.descriptor.method().to_string(),
            expected: 1,
            actual,
        }
    }

    fn convert_all(&self, element: &Element, rows: &[Row]) -> Result<Vec<Item>, QueryError> {
        rows.iter().map(|row| self.convert(element, row)).collect()
    }

    fn convert(&self, element: &Element, row: &Row) -> Result<Item, QueryError> {
        match element {
            Element::Entity(_) => Ok(Item::Entity(row.clone())),
            Element::Scalar { property } => Ok(Item::Scalar(column(row, property.as_deref()))),
            Element::KeyValue { properties } => Ok(Item::KeyValue(row.project(properties))),
            Element::Enum { ty, property } => {
                let enum_type = self
                    .metadata
                    .get_enum(ty)
                    .ok_or_else(|| ConfigError::UnknownEnum { name: ty.clone() })?;
                let value = column(row, property.as_deref());
                let variant = enum_type
                    .variant_for(&value)
                    .ok_or_else(|| ConfigError::UnknownEnumValue {
                        name: ty.clone(),
                        value: value.to_string(),
                    })?;
                Ok(Item::Enum(variant.clone()))
            }
        }
    }
}

/// Value of the named column, or of the first column when none is named. Projected rows
/// carry dotted paths as flat column names.
fn column(row: &Row, property: Option<&str>) -> Value {
    let value = match property {
        Some(property) => row.get(property).or_else(|| row.get_path(property)),
        None => row.first(),
    };
    value.cloned().unwrap_or(Value::Null)
}

/// Drops the look-ahead row, reporting whether it was there.
fn split_look_ahead(mut rows: Vec<Row>, size: Option<u64>) -> (Vec<Row>, bool) {
    let Some(size) = size.and_then(|s| usize::try_from(s).ok()) else {
        return (rows, false);
    };
    let has_next = rows.len() > size;
    rows.truncate(size);
    (rows, has_next)
}

/// Keeps the first occurrence of each item. Quadratic in the item count: items may hold
/// floats, so there is no `Hash` to key on.
fn dedup_in_order(items: &mut Vec<Item>) {
    let mut kept: Vec<Item> = Vec::with_capacity(items.len());
    for item in items.drain(..) {
        if !kept.contains(&item) {
            kept.push(item);
        }
    }
    *items = kept;
}

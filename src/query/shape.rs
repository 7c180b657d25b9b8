//! Return shapes.
//!
//! The declared [`ReturnType`] of a method is resolved once, at compile time, into a
//! [`ReturnShape`]. Materialization matches on the shape and never looks at the declared
//! type again.

use crate::error::ConfigError;
use crate::metadata::{Metadata, ScalarType};
use crate::method::{CollectionKind, ElementType, ReturnType};
use crate::query::descriptor::QueryKind;
use serde::{Deserialize, Serialize};

/// What each returned row turns into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// The row itself.
    Entity(String),
    /// One column: the declared property, or the first column when none is declared.
    Scalar { property: Option<String> },
    /// One column resolved against the variants of an enum.
    Enum { ty: String, property: Option<String> },
    /// The declared properties as a key/value row.
    KeyValue { properties: Vec<String> },
}

/// Collection kinds the materializer knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionShape {
    List,
    /// Duplicates dropped.
    Set,
    /// Duplicates dropped, row order kept.
    LinkedSet,
}

impl CollectionShape {
    pub fn is_set(self) -> bool {
        !matches!(self, CollectionShape::List)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnShape {
    Single(Element),
    Optional(Element),
    Collection { kind: CollectionShape, element: Element },
    Stream(Element),
    Slice(Element),
    Page(Element),
    Count,
    Exists,
}

impl ReturnShape {
    /// Shapes that read one row past the page to detect a following page.
    pub fn looks_ahead(&self) -> bool {
        matches!(self, ReturnShape::Slice(_) | ReturnShape::Page(_))
    }

    pub fn element(&self) -> Option<&Element> {
        match self {
            ReturnShape::Single(e)
            | ReturnShape::Optional(e)
            | ReturnShape::Collection { element: e, .. }
            | ReturnShape::Stream(e)
            | ReturnShape::Slice(e)
            | ReturnShape::Page(e) => Some(e),
            ReturnShape::Count | ReturnShape::Exists => None,
        }
    }
}

/// Inputs to shape resolution besides the declared return type.
pub struct ShapeContext<'a> {
    pub method: &'a str,
    pub kind: QueryKind,
    pub properties: &'a [String],
    pub has_page_parameter: bool,
    pub metadata: &'a Metadata,
}

/// Resolves the declared return type of a method.
///
/// # Errors
///
/// Returns `ConfigError` when the return type cannot be produced by the method's query
/// kind, names an unknown or empty enum, declares too many projection properties, or is a
/// page/slice without a page request parameter.
pub fn resolve(returns: &ReturnType, cx: &ShapeContext<'_>) -> Result<ReturnShape, ConfigError> {
    match cx.kind {
        QueryKind::Count => {
            return match returns {
                ReturnType::Count | ReturnType::Single(ElementType::Scalar(ScalarType::Int)) => {
                    Ok(ReturnShape::Count)
                }
                other => Err(unsupported(cx, format!("a count query cannot return {other:?}"))),
            }
        }
        QueryKind::Exists => {
            return match returns {
                ReturnType::Boolean | ReturnType::Single(ElementType::Scalar(ScalarType::Bool)) => {
                    Ok(ReturnShape::Exists)
                }
                other => Err(unsupported(cx, format!("an exists query cannot return {other:?}"))),
            }
        }
        QueryKind::Find => {}
    }

    let shape = match returns {
        ReturnType::Single(e) => ReturnShape::Single(element(e, cx)?),
        ReturnType::Optional(e) => ReturnShape::Optional(element(e, cx)?),
        ReturnType::Collection { kind, element: e } => ReturnShape::Collection {
            kind: collection(kind, cx.method),
            element: element(e, cx)?,
        },
        ReturnType::Stream(e) => ReturnShape::Stream(element(e, cx)?),
        ReturnType::Slice(e) | ReturnType::Page(e) => {
            if !cx.has_page_parameter {
                return Err(ConfigError::MissingPageParameter {
                    method: cx.method.to_string(),
                });
            }
            let e = element(e, cx)?;
            if matches!(returns, ReturnType::Slice(_)) {
                ReturnShape::Slice(e)
            } else {
                ReturnShape::Page(e)
            }
        }
        ReturnType::Count => {
            return Err(unsupported(cx, "an integer count requires a `count` method"));
        }
        ReturnType::Boolean => {
            return Err(unsupported(cx, "a boolean result requires an `exists` method"));
        }
    };
    Ok(shape)
}

fn element(declared: &ElementType, cx: &ShapeContext<'_>) -> Result<Element, ConfigError> {
    let single_property = || -> Result<Option<String>, ConfigError> {
        match cx.properties {
            [] => Ok(None),
            [only] => Ok(Some(only.clone())),
            many => Err(unsupported(
                cx,
                format!("a single-column result declares {} properties", many.len()),
            )),
        }
    };

    match declared {
        ElementType::Entity(name) => {
            if !cx.properties.is_empty() {
                return Err(unsupported(
                    cx,
                    format!("entity `{name}` results cannot declare result properties"),
                ));
            }
            Ok(Element::Entity(name.clone()))
        }
        ElementType::Scalar(_) => Ok(Element::Scalar {
            property: single_property()?,
        }),
        ElementType::Enum(name) => {
            let enum_type = cx
                .metadata
                .get_enum(name)
                .ok_or_else(|| ConfigError::UnknownEnum { name: name.clone() })?;
            if enum_type.variants.is_empty() {
                return Err(ConfigError::EmptyEnum { name: name.clone() });
            }
            Ok(Element::Enum {
                ty: name.clone(),
                property: single_property()?,
            })
        }
        ElementType::KeyValue => {
            if cx.properties.is_empty() {
                return Err(unsupported(cx, "a key/value result needs declared properties"));
            }
            Ok(Element::KeyValue {
                properties: cx.properties.to_vec(),
            })
        }
    }
}

/// Maps a declared collection type onto a kind the materializer can build. Unknown custom
/// collection types fall back to an ordered list.
fn collection(kind: &CollectionKind, method: &str) -> CollectionShape {
    match kind {
        CollectionKind::List => CollectionShape::List,
        CollectionKind::Set => CollectionShape::Set,
        CollectionKind::LinkedSet => CollectionShape::LinkedSet,
        CollectionKind::Custom(name) => match name.as_str() {
            "Vec" | "VecDeque" | "List" | "ArrayList" | "LinkedList" | "Collection" | "Iterable" => {
                CollectionShape::List
            }
            "Set" | "HashSet" | "BTreeSet" | "SortedSet" | "TreeSet" => CollectionShape::Set,
            "IndexSet" | "LinkedHashSet" => CollectionShape::LinkedSet,
            other => {
                log::warn!(
                    "method `{}`: collection type `{}` is not supported, materializing as a list",
                    method,
                    other
                );
                CollectionShape::List
            }
        },
    }
}

fn unsupported(cx: &ShapeContext<'_>, reason: impl Into<String>) -> ConfigError {
    ConfigError::UnsupportedShape {
        method: cx.method.to_string(),
        reason: reason.into(),
    }
}

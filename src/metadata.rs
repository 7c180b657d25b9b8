//! Entity and enum metadata consulted by the query compiler.
//!
//! The derived-name grammar only knows words; metadata tells it which words form
//! property paths. References and to-many collections let paths continue into another
//! entity (`customerName` can resolve to `customer.name`).

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar property and parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    Decimal,
    Text,
    Uuid,
    Date,
    DateTime,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::Decimal => "decimal",
            ScalarType::Text => "text",
            ScalarType::Uuid => "uuid",
            ScalarType::Date => "date",
            ScalarType::DateTime => "datetime",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Scalar(ScalarType),
    /// Enum-typed property, by enum name.
    Enum(String),
    /// To-one reference to another entity.
    Reference(String),
    /// To-many reference to another entity.
    Collection(String),
}

impl PropertyKind {
    /// Entity a path may continue into after this property.
    pub fn target_entity(&self) -> Option<&str> {
        match self {
            PropertyKind::Reference(target) | PropertyKind::Collection(target) => Some(target),
            PropertyKind::Scalar(_) | PropertyKind::Enum(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMeta {
    pub name: String,
    pub kind: PropertyKind,
}

impl PropertyMeta {
    pub fn scalar(name: impl Into<String>, ty: ScalarType) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Scalar(ty),
        }
    }

    pub fn enumeration(name: impl Into<String>, enum_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Enum(enum_name.into()),
        }
    }

    pub fn reference(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Reference(target.into()),
        }
    }

    pub fn collection(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PropertyKind::Collection(target.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMeta {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<PropertyMeta>,
}

impl EntityMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    pub fn property(mut self, property: PropertyMeta) -> Self {
        self.properties.push(property);
        self
    }

    pub fn find(&self, name: &str) -> Option<&PropertyMeta> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Properties whose name equals `candidate` ignoring ASCII case.
    ///
    /// More than one match means the entity declares names differing only in case.
    pub fn matching(&self, candidate: &str) -> impl Iterator<Item = &PropertyMeta> + '_ {
        let candidate = candidate.to_string();
        self.properties
            .iter()
            .filter(move |p| p.name.eq_ignore_ascii_case(&candidate))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumVariant {
    pub name: String,
    /// Identifier stored in rows for this variant.
    pub id: Value,
}

/// Enum type a method may return; rows carry the variant id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumType {
    pub name: String,
    #[serde(default)]
    pub variants: Vec<EnumVariant>,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
        }
    }

    pub fn variant(mut self, name: impl Into<String>, id: impl Into<Value>) -> Self {
        self.variants.push(EnumVariant {
            name: name.into(),
            id: id.into(),
        });
        self
    }

    /// Variant whose id equals `value` (numeric ids compare across int/float/decimal).
    pub fn variant_for(&self, value: &Value) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.id.loosely_equals(value))
    }
}

/// Registry of the entities and enums a repository may reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    entities: BTreeMap<String, EntityMeta>,
    enums: BTreeMap<String, EnumType>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, entity: EntityMeta) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    pub fn enumeration(mut self, enum_type: EnumType) -> Self {
        self.enums.insert(enum_type.name.clone(), enum_type);
        self
    }

    pub fn get_entity(&self, name: &str) -> Option<&EntityMeta> {
        self.entities.get(name)
    }

    pub fn get_enum(&self, name: &str) -> Option<&EnumType> {
        self.enums.get(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityMeta> {
        self.entities.values()
    }
}

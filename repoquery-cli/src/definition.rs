//! Repository definition files.
//!
//! A definition file is TOML with three arrays of tables:
//!
//! ```toml
//! [[entity]]
//! name = "Order"
//! properties = [
//!     { name = "status", kind = { scalar = "text" } },
//!     { name = "customer", kind = { reference = "Customer" } },
//! ]
//!
//! [[enum]]
//! name = "Priority"
//! variants = [{ name = "A", id = 1 }, { name = "B", id = 2 }]
//!
//! [[method]]
//! entity = "Order"
//! name = "findByStatus"
//! params = [{ name = "status", type = { scalar = "text" } }]
//! returns = { collection = { kind = "list", element = { entity = "Order" } } }
//! ```

use anyhow::Context;
use repoquery::backend::QueryTextHook;
use repoquery::metadata::{EntityMeta, EnumType, Metadata};
use repoquery::{ConfigError, MethodSignature, QueryDescriptor};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Definition {
    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityMeta>,
    #[serde(default, rename = "enum")]
    pub enums: Vec<EnumType>,
    #[serde(default, rename = "method")]
    pub methods: Vec<MethodSignature>,
}

/// Compile outcome of one declared method.
pub struct Compiled<'a> {
    pub signature: &'a MethodSignature,
    pub result: Result<QueryDescriptor, ConfigError>,
}

impl Definition {
    /// Parse a definition from TOML text.
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let definition: Definition = toml::from_str(text).context("invalid repository definition")?;
        log::debug!(
            "parsed definition: {} entities, {} enums, {} methods",
            definition.entities.len(),
            definition.enums.len(),
            definition.methods.len()
        );
        Ok(definition)
    }

    /// Load a definition file from disk.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!("Definition file does not exist: {}", path.display());
        }
        let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn metadata(&self) -> Metadata {
        let metadata = self
            .entities
            .iter()
            .cloned()
            .fold(Metadata::new(), Metadata::entity);
        self.enums.iter().cloned().fold(metadata, Metadata::enumeration)
    }

    /// Compile every declared method, in declaration order.
    pub fn compile_all(&self, hooks: &[Arc<dyn QueryTextHook>]) -> Vec<Compiled<'_>> {
        let metadata = self.metadata();
        self.methods
            .iter()
            .map(|signature| Compiled {
                signature,
                result: QueryDescriptor::compile(signature, &metadata, hooks),
            })
            .collect()
    }

    /// Method declarations whose name matches `name`, or all of them.
    pub fn find_methods<'a>(&'a self, name: Option<&'a str>) -> impl Iterator<Item = &'a MethodSignature> + 'a {
        self.methods
            .iter()
            .filter(move |m| name.map_or(true, |n| m.name == n))
    }
}

//! Derived queries: conditions, limits and sort orders spelled out in the method name.
//!
//! `findDistinctByStatusAndCreatedAfterOrderByCreatedDesc(status, after)` compiles to a
//! distinct load of `status = :status AND created > :after` sorted by `created DESC`.
//! The Nth placeholder of the name binds to the Nth bindable parameter.

mod keywords;
mod parser;
mod path;
mod tokenizer;

use crate::error::ConfigError;
use crate::metadata::{EntityMeta, Metadata, PropertyKind, ScalarType};
use crate::method::ParamDecl;
use crate::query::condition::{Condition, Leaf};
use crate::query::descriptor::QueryKind;
use crate::query::spec::Order;
use parser::Parser;
use std::collections::BTreeSet;

/// Output of compiling a derived method name.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedQuery {
    pub kind: QueryKind,
    pub distinct: bool,
    pub max_results: Option<u64>,
    pub condition: Option<Condition>,
    /// One name per placeholder, aligned with the bindable parameters.
    pub parameter_names: Vec<String>,
    pub sort: Vec<Order>,
}

/// Compiles `method` against `entity`.
///
/// `bindable` lists the bindable parameters as `(argument index, declaration)` pairs in
/// declaration order.
pub fn compile(
    method: &str,
    metadata: &Metadata,
    entity: &EntityMeta,
    bindable: &[(usize, &ParamDecl)],
) -> Result<DerivedQuery, ConfigError> {
    let parsed = Parser::new(method, metadata, entity).parse()?;

    let placeholders: usize = parsed
        .groups
        .iter()
        .flatten()
        .map(|part| part.operator.arity())
        .sum();
    if placeholders != bindable.len() {
        return Err(ConfigError::ParameterCountMismatch {
            method: method.to_string(),
            expected: placeholders,
            actual: bindable.len(),
        });
    }

    let mut namer = Namer::new(bindable.iter().filter_map(|(_, p)| p.binding_name()));
    let mut slots = bindable.iter();
    let mut parameter_names = Vec::with_capacity(placeholders);
    let mut groups = Vec::with_capacity(parsed.groups.len());

    for group in &parsed.groups {
        let mut leaves = Vec::with_capacity(group.len());
        for part in group {
            let mut names = Vec::with_capacity(part.operator.arity());
            for _ in 0..part.operator.arity() {
                let Some((index, param)) = slots.next() else {
                    break;
                };
                if part.operator.takes_collection() && !param.ty.is_collection() {
                    return Err(ConfigError::CollectionParameterRequired {
                        method: method.to_string(),
                        index: *index,
                        operator: part.operator.keyword().to_string(),
                    });
                }
                let name = match param.binding_name() {
                    Some(name) => name.to_string(),
                    None => namer.derive(&part.path.path),
                };
                parameter_names.push(name.clone());
                names.push(name);
            }
            let text = matches!(part.path.kind, PropertyKind::Scalar(ScalarType::Text));
            leaves.push(Condition::Leaf(Leaf {
                property: part.path.path.clone(),
                operator: part.operator,
                parameters: names,
                ignore_case: part.ignore_case || (parsed.all_ignore_case && text),
            }));
        }
        groups.push(Condition::and(leaves));
    }

    let condition = (!groups.is_empty()).then(|| Condition::or(groups));
    log::debug!(
        "compiled derived query `{}`: condition = {}, parameters = {:?}",
        method,
        condition.as_ref().map_or_else(|| "<none>".to_string(), |c| c.to_string()),
        parameter_names
    );

    Ok(DerivedQuery {
        kind: parsed.kind.unwrap_or(QueryKind::Find),
        distinct: parsed.distinct,
        max_results: parsed.max_results,
        condition,
        parameter_names,
        sort: parsed.orders,
    })
}

/// Hands out parameter names for placeholders whose parameter declares none.
struct Namer {
    taken: BTreeSet<String>,
}

impl Namer {
    fn new<'a>(reserved: impl Iterator<Item = &'a str>) -> Self {
        Self {
            taken: reserved.map(str::to_string).collect(),
        }
    }

    /// `customer.name` becomes `customer_name`, then `customer_name_1` and so on.
    fn derive(&mut self, path: &str) -> String {
        let base = path.replace('.', "_");
        let mut candidate = base.clone();
        let mut suffix = 1;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

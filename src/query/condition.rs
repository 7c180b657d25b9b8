//! Condition trees.
//!
//! A [`Condition`] is what a derived method name compiles to and what an ad-hoc query
//! context contributes at call time. Leaves never carry values, only parameter names;
//! values are looked up in the load specification's parameter map.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operator of a condition leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Between,
    In,
    NotIn,
    Like,
    NotLike,
    StartsWith,
    EndsWith,
    Contains,
    NotContains,
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
    IsTrue,
    IsFalse,
}

impl Operator {
    /// Number of parameter placeholders the operator consumes.
    pub const fn arity(self) -> usize {
        match self {
            Operator::Between => 2,
            Operator::IsNull
            | Operator::IsNotNull
            | Operator::IsEmpty
            | Operator::IsNotEmpty
            | Operator::IsTrue
            | Operator::IsFalse => 0,
            _ => 1,
        }
    }

    /// Whether the bound argument must be a collection.
    pub const fn takes_collection(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    pub const fn keyword(self) -> &'static str {
        match self {
            Operator::Equal => "=",
            Operator::NotEqual => "<>",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            Operator::Between => "BETWEEN",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::StartsWith => "STARTS WITH",
            Operator::EndsWith => "ENDS WITH",
            Operator::Contains => "CONTAINS",
            Operator::NotContains => "NOT CONTAINS",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::IsEmpty => "IS EMPTY",
            Operator::IsNotEmpty => "IS NOT EMPTY",
            Operator::IsTrue => "IS TRUE",
            Operator::IsFalse => "IS FALSE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Leaf {
    /// Dotted property path.
    pub property: String,
    pub operator: Operator,
    /// Parameter names, `operator.arity()` of them.
    pub parameters: Vec<String>,
    #[serde(default)]
    pub ignore_case: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Leaf(Leaf),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    pub fn leaf<I, S>(property: impl Into<String>, operator: Operator, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Condition::Leaf(Leaf {
            property: property.into(),
            operator,
            parameters: parameters.into_iter().map(Into::into).collect(),
            ignore_case: false,
        })
    }

    /// Conjunction; nested conjunctions are flattened and a single child is returned as-is.
    pub fn and(children: Vec<Condition>) -> Self {
        Self::group(children, true)
    }

    /// Disjunction; nested disjunctions are flattened and a single child is returned as-is.
    pub fn or(children: Vec<Condition>) -> Self {
        Self::group(children, false)
    }

    fn group(children: Vec<Condition>, conjunction: bool) -> Self {
        let mut flat = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Condition::And(inner) if conjunction => flat.extend(inner),
                Condition::Or(inner) if !conjunction => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            if let Some(only) = flat.pop() {
                return only;
            }
        }
        if conjunction {
            Condition::And(flat)
        } else {
            Condition::Or(flat)
        }
    }

    /// Parameter names in left-to-right order, repeats included.
    pub fn parameter_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.visit_leaves(&mut |leaf| names.extend(leaf.parameters.iter().map(String::as_str)));
        names
    }

    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut leaves = Vec::new();
        self.visit_leaves(&mut |leaf| leaves.push(leaf));
        leaves
    }

    fn visit_leaves<'a>(&'a self, f: &mut dyn FnMut(&'a Leaf)) {
        match self {
            Condition::Leaf(leaf) => f(leaf),
            Condition::And(children) | Condition::Or(children) => {
                for child in children {
                    child.visit_leaves(f);
                }
            }
        }
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let property = if self.ignore_case {
            format!("UPPER({})", self.property)
        } else {
            self.property.clone()
        };
        let param = |i: usize| -> String {
            let name = self.parameters.get(i).map_or("?", String::as_str);
            if self.ignore_case {
                format!("UPPER(:{name})")
            } else {
                format!(":{name}")
            }
        };
        match self.operator.arity() {
            0 => write!(f, "{property} {}", self.operator.keyword()),
            2 => write!(
                f,
                "{property} {} {} AND {}",
                self.operator.keyword(),
                param(0),
                param(1)
            ),
            _ => write!(f, "{property} {} {}", self.operator.keyword(), param(0)),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Leaf(leaf) => write!(f, "{leaf}"),
            Condition::And(children) => write_group(f, children, " AND "),
            Condition::Or(children) => write_group(f, children, " OR "),
        }
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, children: &[Condition], separator: &str) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        match child {
            Condition::Leaf(_) => write!(f, "{child}")?,
            _ => write!(f, "({child})")?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_example() {
        let c = Condition::and(vec![
            Condition::leaf("status", Operator::Equal, ["status"]),
            Condition::leaf("created", Operator::GreaterThan, ["after"]),
        ]);
        assert_eq!(c.to_string(), "status = :status AND created > :after");
    }

    #[test]
    fn test_nested_groups_are_parenthesized() {
        let c = Condition::or(vec![
            Condition::and(vec![
                Condition::leaf("a", Operator::Equal, ["a"]),
                Condition::leaf("b", Operator::Between, ["lo", "hi"]),
            ]),
            Condition::leaf("c", Operator::IsNull, Vec::<String>::new()),
        ]);
        assert_eq!(c.to_string(), "(a = :a AND b BETWEEN :lo AND :hi) OR c IS NULL");
    }

    #[test]
    fn test_flattening_and_single_child() {
        let inner = Condition::and(vec![
            Condition::leaf("a", Operator::Equal, ["a"]),
            Condition::leaf("b", Operator::Equal, ["b"]),
        ]);
        let outer = Condition::and(vec![inner, Condition::leaf("c", Operator::Equal, ["c"])]);
        assert!(matches!(&outer, Condition::And(children) if children.len() == 3));
        let single = Condition::or(vec![Condition::leaf("a", Operator::Equal, ["a"])]);
        assert!(matches!(single, Condition::Leaf(_)));
    }

    #[test]
    fn test_parameter_names_in_order() {
        let c = Condition::and(vec![
            Condition::leaf("age", Operator::Between, ["min", "max"]),
            Condition::leaf("name", Operator::IsNotNull, Vec::<String>::new()),
            Condition::leaf("city", Operator::In, ["cities"]),
        ]);
        assert_eq!(c.parameter_names(), vec!["min", "max", "cities"]);
        assert_eq!(c.leaves().len(), 3);
    }

    #[test]
    fn test_ignore_case_display() {
        let mut c = Condition::leaf("name", Operator::Equal, ["name"]);
        if let Condition::Leaf(leaf) = &mut c {
            leaf.ignore_case = true;
        }
        assert_eq!(c.to_string(), "UPPER(name) = UPPER(:name)");
    }
}

//! Rows returned by a backend.
//!
//! A [`Row`] is an ordered list of named values. Entity rows carry one entry per loaded
//! property; nested references are stored as [`Value::Row`] and to-many references as
//! [`Value::List`] of rows, which is what dotted property paths walk through.

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set `name` to `value`, replacing an existing entry in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Value of the first column, used for scalar projections without a declared property.
    pub fn first(&self) -> Option<&Value> {
        self.fields.first().map(|(_, v)| v)
    }

    /// Follow a dotted property path through nested rows.
    ///
    /// Returns every value reachable under the path: to-many segments fan out over the
    /// rows of a list, so `lines.sku` on an order yields one value per line. A missing
    /// segment yields nothing.
    pub fn values_at(&self, path: &str) -> Vec<&Value> {
        let mut current: Vec<&Value> = Vec::new();
        let mut segments = path.split('.');
        let Some(head) = segments.next() else {
            return current;
        };
        if let Some(value) = self.get(head) {
            current.push(value);
        }
        for segment in segments {
            let mut next = Vec::new();
            for value in current {
                match value {
                    Value::Row(row) => next.extend(row.get(segment)),
                    Value::List(items) => {
                        for item in items {
                            if let Value::Row(row) = item {
                                next.extend(row.get(segment));
                            }
                        }
                    }
                    _ => {}
                }
            }
            current = next;
        }
        current
    }

    /// First value under a dotted path, if any.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        self.values_at(path).into_iter().next()
    }

    /// Keep only the named properties, in the given order. Missing properties become `Null`.
    pub fn project(&self, properties: &[String]) -> Row {
        properties
            .iter()
            .map(|p| (p.clone(), self.get_path(p).cloned().unwrap_or_default()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (name, value) in iter {
            row.insert(name, value);
        }
        row
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        write!(f, "}}")
    }
}

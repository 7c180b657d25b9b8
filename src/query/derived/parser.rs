//! Recursive-descent parser for derived method names.
//!
//! ```text
//! method    := prefix subject? ("By" predicate?)? ("OrderBy" orders)?
//! subject   := ("Distinct" | ("First" | "Top") number? | "All" | word)*
//! predicate := and ("Or" and)* ("AllIgnoreCase" | "AllIgnoringCase")?
//! and       := part ("And" part)*
//! part      := path operator? ("IgnoreCase" | "IgnoringCase")?
//! orders    := (path ("Asc" | "Desc"))* path ("Asc" | "Desc")?
//! ```

use super::keywords::{self, Prefix};
use super::path::{self, PathMatch, ResolvedPath};
use super::tokenizer::{tokenize, Word};
use crate::error::ConfigError;
use crate::metadata::{EntityMeta, Metadata};
use crate::query::condition::Operator;
use crate::query::descriptor::QueryKind;
use crate::query::spec::{Direction, Order};

/// One predicate part before parameter names are assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub path: ResolvedPath,
    pub operator: Operator,
    pub ignore_case: bool,
}

/// Parsed method name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedName {
    pub kind: Option<QueryKind>,
    pub distinct: bool,
    pub max_results: Option<u64>,
    /// Disjunction of conjunctions.
    pub groups: Vec<Vec<Part>>,
    pub all_ignore_case: bool,
    pub orders: Vec<Order>,
}

pub struct Parser<'a> {
    method: &'a str,
    metadata: &'a Metadata,
    entity: &'a EntityMeta,
    words: Vec<Word>,
}

impl<'a> Parser<'a> {
    pub fn new(method: &'a str, metadata: &'a Metadata, entity: &'a EntityMeta) -> Self {
        Self {
            method,
            metadata,
            entity,
            words: tokenize(method),
        }
    }

    pub fn parse(&self) -> Result<ParsedName, ConfigError> {
        let Some(first) = self.words.first() else {
            return Err(self.invalid("method name is empty"));
        };
        let kind = match keywords::prefix(&first.text) {
            Some(Prefix::Query(kind)) => kind,
            Some(Prefix::Unsupported) => {
                return Err(ConfigError::UnsupportedQueryKind {
                    method: self.method.to_string(),
                    prefix: first.text.clone(),
                })
            }
            None => {
                return Err(self.invalid(format!(
                    "`{}` is not a query prefix and no query text is declared",
                    first.text
                )))
            }
        };

        let mut parsed = ParsedName {
            kind: Some(kind),
            ..ParsedName::default()
        };

        let len = self.words.len();
        let (subject_end, predicate_start) = self.subject_bounds();
        self.parse_subject(&self.words[1..subject_end], &mut parsed)?;

        let order_at = predicate_start
            .map_or(subject_end, |start| self.find_order_by(start).unwrap_or(len));
        if let Some(start) = predicate_start {
            self.parse_predicate(start, order_at, &mut parsed)?;
        }
        if order_at < len {
            let orders_start = order_at + 2;
            if orders_start >= len {
                return Err(self.invalid("`OrderBy` is not followed by a property"));
            }
            parsed.orders = self.parse_orders(orders_start)?;
        }
        Ok(parsed)
    }

    /// End of the subject and start of the predicate, if there is a `By`.
    ///
    /// `Order` `By` after a non-empty subject made only of modifiers opens the order clause
    /// instead (`findAllOrderByName`). Directly after the prefix, `Order` is the subject and
    /// `By` opens the predicate (`findOrderByStatus`); sort-only methods spell it
    /// `findByOrderByName`.
    fn subject_bounds(&self) -> (usize, Option<usize>) {
        let len = self.words.len();
        for i in 1..len {
            if self.words[i].is(keywords::BY) {
                return (i, Some(i + 1));
            }
            if i > 1 && self.is_order_by(i) && self.words[1..i].iter().all(keywords::is_modifier) {
                return (i, None);
            }
        }
        (len, None)
    }

    fn is_order_by(&self, i: usize) -> bool {
        self.words[i].is(keywords::ORDER)
            && self.words.get(i + 1).is_some_and(|w| w.is(keywords::BY))
    }

    fn find_order_by(&self, from: usize) -> Option<usize> {
        (from..self.words.len()).find(|&i| self.is_order_by(i))
    }

    fn parse_subject(&self, subject: &[Word], parsed: &mut ParsedName) -> Result<(), ConfigError> {
        let mut i = 0;
        while i < subject.len() {
            let word = &subject[i];
            if word.is(keywords::DISTINCT) {
                parsed.distinct = true;
            } else if word.is(keywords::FIRST) || word.is(keywords::TOP) {
                let mut limit = 1;
                if let Some(next) = subject.get(i + 1).filter(|w| w.is_number()) {
                    limit = next
                        .text
                        .parse::<u64>()
                        .map_err(|_| self.invalid(format!("`{}` is not a valid limit", next.text)))?;
                    i += 1;
                }
                if limit == 0 {
                    return Err(self.invalid(format!("`{}0` limits the result to nothing", word.text)));
                }
                parsed.max_results = Some(limit);
            }
            i += 1;
        }
        Ok(())
    }

    fn parse_predicate(&self, start: usize, end: usize, parsed: &mut ParsedName) -> Result<(), ConfigError> {
        let mut end = end;
        for suffix in keywords::ALL_IGNORE_CASE {
            if end >= start + suffix.len() && keywords::starts_with(&self.words[end - suffix.len()..end], suffix) {
                parsed.all_ignore_case = true;
                end -= suffix.len();
                break;
            }
        }
        if start == end {
            return Ok(());
        }

        let mut group = Vec::new();
        let mut i = start;
        loop {
            let (part, next) = self.parse_part(i, end)?;
            group.push(part);
            if next == end {
                break;
            }
            if self.words[next].is(keywords::OR) {
                parsed.groups.push(std::mem::take(&mut group));
            }
            i = next + 1;
            if i == end {
                return Err(self.invalid(format!("dangling `{}` at the end of the criteria", self.words[next].text)));
            }
        }
        parsed.groups.push(group);
        Ok(())
    }

    /// Longest word span that resolves to a property and is followed by an operator.
    fn parse_part(&self, start: usize, end: usize) -> Result<(Part, usize), ConfigError> {
        for span in (1..=end - start).rev() {
            let resolved = match path::resolve(self.metadata, self.entity, &self.words[start..start + span]) {
                PathMatch::None => continue,
                PathMatch::Unique(path) => Ok(path),
                PathMatch::Ambiguous(candidates) => Err(candidates),
            };
            let Some((operator, ignore_case, next)) = self.operator_at(start + span, end) else {
                continue;
            };
            return match resolved {
                Ok(path) => Ok((
                    Part {
                        path,
                        operator,
                        ignore_case,
                    },
                    next,
                )),
                Err(candidates) => Err(ConfigError::AmbiguousPropertyPath {
                    method: self.method.to_string(),
                    words: self.join(start, start + span),
                    candidates,
                }),
            };
        }
        let part_end = (start..end)
            .find(|&i| self.words[i].is(keywords::AND) || self.words[i].is(keywords::OR))
            .unwrap_or(end);
        Err(ConfigError::UnknownProperty {
            method: self.method.to_string(),
            entity: self.entity.name.clone(),
            words: self.join(start, part_end.max(start + 1)),
        })
    }

    /// Operator, ignore-case flag and the index after them, when the words from `at`
    /// form a complete operator continuation.
    fn operator_at(&self, at: usize, end: usize) -> Option<(Operator, bool, usize)> {
        let rest = &self.words[at..end];
        keywords::operators().iter().find_map(|(spelling, operator)| {
            if !keywords::starts_with(rest, spelling) {
                return None;
            }
            let mut next = at + spelling.len();
            let mut ignore_case = false;
            for suffix in keywords::IGNORE_CASE {
                if keywords::starts_with(&self.words[next..end], suffix) {
                    ignore_case = true;
                    next += suffix.len();
                    break;
                }
            }
            let boundary = next == end
                || self.words[next].is(keywords::AND)
                || self.words[next].is(keywords::OR);
            boundary.then_some((*operator, ignore_case, next))
        })
    }

    fn parse_orders(&self, start: usize) -> Result<Vec<Order>, ConfigError> {
        let len = self.words.len();
        let mut orders = Vec::new();
        let mut i = start;
        while i < len {
            let (order, next) = self.parse_order(i)?;
            orders.push(order);
            i = next;
        }
        Ok(orders)
    }

    fn parse_order(&self, start: usize) -> Result<(Order, usize), ConfigError> {
        let len = self.words.len();
        for span in (1..=len - start).rev() {
            let next = start + span;
            let (direction, after) = match self.words.get(next) {
                None => (Direction::Asc, next),
                Some(w) if w.is(keywords::ASC) => (Direction::Asc, next + 1),
                Some(w) if w.is(keywords::DESC) => (Direction::Desc, next + 1),
                Some(_) => continue,
            };
            match path::resolve(self.metadata, self.entity, &self.words[start..next]) {
                PathMatch::None => continue,
                PathMatch::Unique(path) => {
                    return Ok((
                        Order {
                            property: path.path,
                            direction,
                        },
                        after,
                    ))
                }
                PathMatch::Ambiguous(candidates) => {
                    return Err(ConfigError::AmbiguousPropertyPath {
                        method: self.method.to_string(),
                        words: self.join(start, next),
                        candidates,
                    })
                }
            }
        }
        Err(ConfigError::UnknownProperty {
            method: self.method.to_string(),
            entity: self.entity.name.clone(),
            words: self.join(start, len),
        })
    }

    fn join(&self, start: usize, end: usize) -> String {
        self.words[start..end.min(self.words.len())]
            .iter()
            .map(|w| w.text.as_str())
            .collect()
    }

    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidMethodName {
            method: self.method.to_string(),
            reason: reason.into(),
        }
    }
}

//! Condition evaluation and ordering over in-memory rows.
//!
//! A leaf holds when any value under its property path satisfies the operator, so a
//! condition on `lines.sku` matches an order if one of its lines matches.

use crate::error::BackendError;
use crate::query::condition::{Condition, Leaf, Operator};
use crate::query::spec::{Direction, Order};
use crate::value::{Row, Value};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;

static NULL: Value = Value::Null;

/// Evaluates `condition` against `row`, looking placeholder values up in `params`.
///
/// # Errors
///
/// Returns `BackendError` when a leaf names a parameter that has no value.
pub fn matches(condition: &Condition, row: &Row, params: &BTreeMap<String, Value>) -> Result<bool, BackendError> {
    match condition {
        Condition::Leaf(leaf) => leaf_matches(leaf, row, params),
        Condition::And(children) => {
            for child in children {
                if !matches(child, row, params)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Condition::Or(children) => {
            for child in children {
                if matches(child, row, params)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

fn leaf_matches(leaf: &Leaf, row: &Row, params: &BTreeMap<String, Value>) -> Result<bool, BackendError> {
    let mut args = Vec::with_capacity(leaf.parameters.len());
    for name in &leaf.parameters {
        let value = params
            .get(name)
            .ok_or_else(|| BackendError::new(format!("no value bound for parameter `{name}`")))?;
        args.push(fold(value, leaf.ignore_case));
    }
    let values: Vec<Cow<'_, Value>> = row
        .values_at(&leaf.property)
        .into_iter()
        .map(|v| fold(v, leaf.ignore_case))
        .collect();

    let arg = |i: usize| args.get(i).map_or(&NULL, |v| v.as_ref());
    let any = |test: &dyn Fn(&Value) -> bool| values.iter().any(|v| test(v.as_ref()));

    let result = match leaf.operator {
        Operator::IsNull => values.iter().all(|v| v.is_null()),
        Operator::IsNotNull => !values.iter().all(|v| v.is_null()),
        Operator::IsEmpty => values.iter().all(|v| is_empty(v)),
        Operator::IsNotEmpty => !values.iter().all(|v| is_empty(v)),
        Operator::IsTrue => any(&|v| *v == Value::Bool(true)),
        Operator::IsFalse => any(&|v| *v == Value::Bool(false)),
        Operator::Equal => any(&|v| v.loosely_equals(arg(0))),
        Operator::NotEqual => any(&|v| !v.is_null() && !v.loosely_equals(arg(0))),
        Operator::GreaterThan => any(&|v| v.compare(arg(0)) == Some(Ordering::Greater)),
        Operator::GreaterThanOrEqual => {
            any(&|v| matches!(v.compare(arg(0)), Some(Ordering::Greater | Ordering::Equal)))
        }
        Operator::LessThan => any(&|v| v.compare(arg(0)) == Some(Ordering::Less)),
        Operator::LessThanOrEqual => {
            any(&|v| matches!(v.compare(arg(0)), Some(Ordering::Less | Ordering::Equal)))
        }
        Operator::Between => any(&|v| {
            matches!(v.compare(arg(0)), Some(Ordering::Greater | Ordering::Equal))
                && matches!(v.compare(arg(1)), Some(Ordering::Less | Ordering::Equal))
        }),
        Operator::In => any(&|v| candidates(arg(0)).iter().any(|c| v.loosely_equals(c))),
        Operator::NotIn => any(&|v| !v.is_null() && !candidates(arg(0)).iter().any(|c| v.loosely_equals(c))),
        Operator::Like => any(&|v| text_test(v, arg(0), like)),
        Operator::NotLike => any(&|v| text_test(v, arg(0), |s, p| !like(s, p))),
        Operator::StartsWith => any(&|v| text_test(v, arg(0), |s, p| s.starts_with(p))),
        Operator::EndsWith => any(&|v| text_test(v, arg(0), |s, p| s.ends_with(p))),
        Operator::Contains => any(&|v| contains(v, arg(0))),
        Operator::NotContains => any(&|v| !v.is_null() && !contains(v, arg(0))),
    };
    Ok(result)
}

/// Lower-cases text when the comparison ignores case.
fn fold(value: &Value, ignore_case: bool) -> Cow<'_, Value> {
    match value {
        Value::Text(s) if ignore_case => Cow::Owned(Value::Text(s.to_lowercase())),
        Value::List(items) if ignore_case => Cow::Owned(Value::List(
            items.iter().map(|v| fold(v, true).into_owned()).collect(),
        )),
        other => Cow::Borrowed(other),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::List(items) => items.is_empty(),
        Value::Text(s) => s.is_empty(),
        _ => false,
    }
}

fn candidates(arg: &Value) -> Vec<Value> {
    match arg {
        Value::List(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn text_test(value: &Value, arg: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    match (value.as_text(), arg.as_text()) {
        (Some(s), Some(p)) => test(s, p),
        _ => false,
    }
}

fn contains(value: &Value, arg: &Value) -> bool {
    match value {
        Value::List(items) => items.iter().any(|item| item.loosely_equals(arg)),
        _ => text_test(value, arg, |s, p| s.contains(p)),
    }
}

/// SQL `LIKE`: `%` matches any run of characters, `_` exactly one.
pub fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '%')
}

/// Orders two rows by a sort list. Nulls and missing values sort first when ascending.
pub fn compare_rows(a: &Row, b: &Row, orders: &[Order]) -> Ordering {
    for order in orders {
        let left = a.get_path(&order.property).unwrap_or(&NULL);
        let right = b.get_path(&order.property).unwrap_or(&NULL);
        let ordering = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => left.compare(right).unwrap_or(Ordering::Equal),
        };
        let ordering = match order.direction {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_row() -> Row {
        Row::new()
            .with("status", "open")
            .with("total", 120)
            .with("note", Value::Null)
            .with("customer", Row::new().with("name", "Ada Lovelace"))
            .with(
                "lines",
                vec![
                    Value::Row(Row::new().with("sku", "A-1")),
                    Value::Row(Row::new().with("sku", "B-2")),
                ],
            )
            .with("tags", vec![Value::from("rush")])
    }

    fn params(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn eval(condition: Condition, pairs: &[(&str, Value)]) -> bool {
        matches(&condition, &order_row(), &params(pairs)).unwrap()
    }

    #[test]
    fn test_comparisons() {
        assert!(eval(Condition::leaf("status", Operator::Equal, ["s"]), &[("s", "open".into())]));
        assert!(eval(Condition::leaf("total", Operator::GreaterThan, ["t"]), &[("t", Value::Float(99.5))]));
        assert!(eval(
            Condition::leaf("total", Operator::Between, ["lo", "hi"]),
            &[("lo", 100.into()), ("hi", 120.into())]
        ));
        assert!(!eval(Condition::leaf("total", Operator::LessThan, ["t"]), &[("t", 120.into())]));
    }

    #[test]
    fn test_null_and_empty() {
        assert!(eval(Condition::leaf("note", Operator::IsNull, Vec::<String>::new()), &[]));
        assert!(eval(Condition::leaf("missing", Operator::IsNull, Vec::<String>::new()), &[]));
        assert!(eval(Condition::leaf("lines", Operator::IsNotEmpty, Vec::<String>::new()), &[]));
        assert!(!eval(Condition::leaf("note", Operator::NotEqual, ["x"]), &[("x", "a".into())]));
    }

    #[test]
    fn test_nested_paths_fan_out() {
        assert!(eval(Condition::leaf("lines.sku", Operator::Equal, ["sku"]), &[("sku", "B-2".into())]));
        assert!(eval(
            Condition::leaf("customer.name", Operator::StartsWith, ["p"]),
            &[("p", "Ada".into())]
        ));
    }

    #[test]
    fn test_in_and_contains() {
        let statuses = Value::List(vec!["closed".into(), "open".into()]);
        assert!(eval(Condition::leaf("status", Operator::In, ["s"]), &[("s", statuses.clone())]));
        assert!(!eval(Condition::leaf("status", Operator::NotIn, ["s"]), &[("s", statuses)]));
        assert!(eval(Condition::leaf("tags", Operator::Contains, ["t"]), &[("t", "rush".into())]));
        assert!(eval(Condition::leaf("customer.name", Operator::Contains, ["t"]), &[("t", "Love".into())]));
    }

    #[test]
    fn test_ignore_case() {
        let mut leaf = Condition::leaf("status", Operator::Equal, ["s"]);
        assert!(!eval(leaf.clone(), &[("s", "OPEN".into())]));
        if let Condition::Leaf(l) = &mut leaf {
            l.ignore_case = true;
        }
        assert!(eval(leaf, &[("s", "OPEN".into())]));
    }

    #[test]
    fn test_missing_parameter_is_an_error() {
        let err = matches(
            &Condition::leaf("status", Operator::Equal, ["s"]),
            &order_row(),
            &BTreeMap::new(),
        )
        .unwrap_err();
        assert_eq!(err.message(), "no value bound for parameter `s`");
    }

    #[test]
    fn test_like() {
        assert!(like("Ada Lovelace", "Ada%"));
        assert!(!like("Ada Lovelace", "%love%"));
        assert!(like("A-1", "A-_"));
        assert!(like("abc", "%%c"));
        assert!(!like("abc", "a_"));
    }

    #[test]
    fn test_compare_rows() {
        let a = Row::new().with("n", 1).with("s", "x");
        let b = Row::new().with("n", 1).with("s", "y");
        let c = Row::new().with("s", "z");
        assert_eq!(compare_rows(&a, &b, &[Order::asc("n"), Order::desc("s")]), Ordering::Greater);
        assert_eq!(compare_rows(&c, &a, &[Order::asc("n")]), Ordering::Less);
    }
}

//! Reserved words of the method-name grammar.

use super::tokenizer::Word;
use crate::query::condition::Operator;
use crate::query::descriptor::QueryKind;
use once_cell::sync::Lazy;

pub const BY: &str = "By";
pub const AND: &str = "And";
pub const OR: &str = "Or";
pub const ORDER: &str = "Order";
pub const ASC: &str = "Asc";
pub const DESC: &str = "Desc";
pub const DISTINCT: &str = "Distinct";
pub const FIRST: &str = "First";
pub const TOP: &str = "Top";
pub const ALL: &str = "All";

pub const IGNORE_CASE: [&[&str]; 2] = [&["Ignore", "Case"], &["Ignoring", "Case"]];
pub const ALL_IGNORE_CASE: [&[&str]; 2] = [&["All", "Ignore", "Case"], &["All", "Ignoring", "Case"]];

/// What a leading verb asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    Query(QueryKind),
    /// Recognized but not something a load can answer.
    Unsupported,
}

pub fn prefix(word: &str) -> Option<Prefix> {
    match word {
        "find" | "read" | "get" | "query" | "search" | "stream" | "list" => {
            Some(Prefix::Query(QueryKind::Find))
        }
        "count" => Some(Prefix::Query(QueryKind::Count)),
        "exists" => Some(Prefix::Query(QueryKind::Exists)),
        "delete" | "remove" => Some(Prefix::Unsupported),
        _ => None,
    }
}

const OPERATOR_TABLE: &[(&[&str], Operator)] = &[
    (&["Is"], Operator::Equal),
    (&["Equals"], Operator::Equal),
    (&["Is", "Equal", "To"], Operator::Equal),
    (&["Not"], Operator::NotEqual),
    (&["Is", "Not"], Operator::NotEqual),
    (&["Greater", "Than"], Operator::GreaterThan),
    (&["Is", "Greater", "Than"], Operator::GreaterThan),
    (&["After"], Operator::GreaterThan),
    (&["Is", "After"], Operator::GreaterThan),
    (&["Greater", "Than", "Equal"], Operator::GreaterThanOrEqual),
    (&["Is", "Greater", "Than", "Equal"], Operator::GreaterThanOrEqual),
    (&["Greater", "Than", "Or", "Equal"], Operator::GreaterThanOrEqual),
    (&["Less", "Than"], Operator::LessThan),
    (&["Is", "Less", "Than"], Operator::LessThan),
    (&["Before"], Operator::LessThan),
    (&["Is", "Before"], Operator::LessThan),
    (&["Less", "Than", "Equal"], Operator::LessThanOrEqual),
    (&["Is", "Less", "Than", "Equal"], Operator::LessThanOrEqual),
    (&["Less", "Than", "Or", "Equal"], Operator::LessThanOrEqual),
    (&["Between"], Operator::Between),
    (&["Is", "Between"], Operator::Between),
    (&["In"], Operator::In),
    (&["Is", "In"], Operator::In),
    (&["Not", "In"], Operator::NotIn),
    (&["Is", "Not", "In"], Operator::NotIn),
    (&["Like"], Operator::Like),
    (&["Is", "Like"], Operator::Like),
    (&["Not", "Like"], Operator::NotLike),
    (&["Is", "Not", "Like"], Operator::NotLike),
    (&["Starting", "With"], Operator::StartsWith),
    (&["Is", "Starting", "With"], Operator::StartsWith),
    (&["Starts", "With"], Operator::StartsWith),
    (&["Ending", "With"], Operator::EndsWith),
    (&["Is", "Ending", "With"], Operator::EndsWith),
    (&["Ends", "With"], Operator::EndsWith),
    (&["Containing"], Operator::Contains),
    (&["Is", "Containing"], Operator::Contains),
    (&["Contains"], Operator::Contains),
    (&["Not", "Containing"], Operator::NotContains),
    (&["Is", "Not", "Containing"], Operator::NotContains),
    (&["Not", "Contains"], Operator::NotContains),
    (&["Null"], Operator::IsNull),
    (&["Is", "Null"], Operator::IsNull),
    (&["Not", "Null"], Operator::IsNotNull),
    (&["Is", "Not", "Null"], Operator::IsNotNull),
    (&["Empty"], Operator::IsEmpty),
    (&["Is", "Empty"], Operator::IsEmpty),
    (&["Not", "Empty"], Operator::IsNotEmpty),
    (&["Is", "Not", "Empty"], Operator::IsNotEmpty),
    (&["True"], Operator::IsTrue),
    (&["Is", "True"], Operator::IsTrue),
    (&["False"], Operator::IsFalse),
    (&["Is", "False"], Operator::IsFalse),
];

/// Operator spellings, longest first, ending with the implicit equality.
static OPERATORS: Lazy<Vec<(&'static [&'static str], Operator)>> = Lazy::new(|| {
    let mut table = OPERATOR_TABLE.to_vec();
    table.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    table.push((&[], Operator::Equal));
    table
});

pub fn operators() -> &'static [(&'static [&'static str], Operator)] {
    &OPERATORS
}

/// True when `words` begins with the keyword sequence `keyword`.
pub fn starts_with(words: &[Word], keyword: &[&str]) -> bool {
    words.len() >= keyword.len() && words.iter().zip(keyword).all(|(w, k)| w.is(k))
}

/// Subject words that change the load rather than describe it.
pub fn is_modifier(word: &Word) -> bool {
    word.is(DISTINCT) || word.is(FIRST) || word.is(TOP) || word.is(ALL) || word.is_number()
}

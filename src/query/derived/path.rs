//! Resolution of word spans to property paths.

use super::tokenizer::Word;
use crate::metadata::{EntityMeta, Metadata, PropertyKind};

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    /// Dotted path of declared property names.
    pub path: String,
    pub segments: usize,
    /// Kind of the last property on the path.
    pub kind: PropertyKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathMatch {
    None,
    Unique(ResolvedPath),
    /// Several segmentations tie on the fewest segments.
    Ambiguous(Vec<String>),
}

/// Resolves the whole of `words` as one property path starting at `entity`.
///
/// Every segmentation whose segments name properties (continuing through references and
/// collections) is a candidate; the fewest segments win.
pub fn resolve(metadata: &Metadata, entity: &EntityMeta, words: &[Word]) -> PathMatch {
    if words.is_empty() {
        return PathMatch::None;
    }
    let mut candidates = Vec::new();
    walk(metadata, entity, words, 0, &mut Vec::new(), &mut candidates);

    let Some(fewest) = candidates.iter().map(|c| c.segments).min() else {
        return PathMatch::None;
    };
    let mut best: Vec<ResolvedPath> = candidates
        .into_iter()
        .filter(|c| c.segments == fewest)
        .collect();
    best.sort_by(|a, b| a.path.cmp(&b.path));
    best.dedup_by(|a, b| a.path == b.path);

    if best.len() == 1 {
        match best.pop() {
            Some(only) => PathMatch::Unique(only),
            None => PathMatch::None,
        }
    } else {
        PathMatch::Ambiguous(best.into_iter().map(|c| c.path).collect())
    }
}

fn walk(
    metadata: &Metadata,
    entity: &EntityMeta,
    words: &[Word],
    start: usize,
    prefix: &mut Vec<String>,
    out: &mut Vec<ResolvedPath>,
) {
    let mut candidate = String::new();
    for end in start + 1..=words.len() {
        let word = &words[end - 1];
        if end - 1 > start && word.hard_break {
            break;
        }
        candidate.push_str(&word.text);
        for property in entity.matching(&candidate) {
            prefix.push(property.name.clone());
            if end == words.len() {
                out.push(ResolvedPath {
                    path: prefix.join("."),
                    segments: prefix.len(),
                    kind: property.kind.clone(),
                });
            } else if let Some(target) = property
                .kind
                .target_entity()
                .and_then(|name| metadata.get_entity(name))
            {
                walk(metadata, target, words, end, prefix, out);
            }
            prefix.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{PropertyMeta, ScalarType};
    use crate::query::derived::tokenizer::tokenize;

    fn metadata() -> Metadata {
        Metadata::new()
            .entity(
                EntityMeta::new("Order")
                    .property(PropertyMeta::scalar("status", ScalarType::Text))
                    .property(PropertyMeta::scalar("customerName", ScalarType::Text))
                    .property(PropertyMeta::reference("customer", "Customer"))
                    .property(PropertyMeta::collection("lines", "Line")),
            )
            .entity(
                EntityMeta::new("Customer")
                    .property(PropertyMeta::scalar("name", ScalarType::Text))
                    .property(PropertyMeta::reference("address", "Address")),
            )
            .entity(EntityMeta::new("Address").property(PropertyMeta::scalar("zipCode", ScalarType::Text)))
            .entity(EntityMeta::new("Line").property(PropertyMeta::scalar("sku", ScalarType::Text)))
    }

    fn resolve_name(name: &str) -> PathMatch {
        let metadata = metadata();
        let order = metadata.get_entity("Order").unwrap().clone();
        resolve(&metadata, &order, &tokenize(name))
    }

    #[test]
    fn test_fewest_segments_win() {
        match resolve_name("CustomerName") {
            PathMatch::Unique(p) => {
                assert_eq!(p.path, "customerName");
                assert_eq!(p.segments, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_nested_path_through_references() {
        match resolve_name("CustomerAddressZipCode") {
            PathMatch::Unique(p) => assert_eq!(p.path, "customer.address.zipCode"),
            other => panic!("unexpected {other:?}"),
        }
        match resolve_name("LinesSku") {
            PathMatch::Unique(p) => assert_eq!(p.path, "lines.sku"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_underscore_forces_boundary() {
        match resolve_name("Customer_Name") {
            PathMatch::Unique(p) => assert_eq!(p.path, "customer.name"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_words() {
        assert_eq!(resolve_name("Total"), PathMatch::None);
        assert_eq!(resolve_name("StatusTotal"), PathMatch::None);
    }

    #[test]
    fn test_equal_segment_counts_are_ambiguous() {
        let metadata = Metadata::new()
            .entity(
                EntityMeta::new("Person")
                    .property(PropertyMeta::reference("homeAddress", "Address"))
                    .property(PropertyMeta::reference("home", "Dwelling")),
            )
            .entity(EntityMeta::new("Address").property(PropertyMeta::scalar("line", ScalarType::Text)))
            .entity(EntityMeta::new("Dwelling").property(PropertyMeta::scalar("addressLine", ScalarType::Text)));
        let person = metadata.get_entity("Person").unwrap();
        match resolve(&metadata, person, &tokenize("HomeAddressLine")) {
            PathMatch::Ambiguous(candidates) => {
                assert_eq!(candidates, vec!["home.addressLine", "homeAddress.line"])
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

//! Property tests for derived method names.
//!
//! Method names are generated from random predicate parts; every generated name must
//! compile, bind one name per placeholder and carry one value per name into the load.

use proptest::prelude::*;
use repoquery::backend::PassthroughResolver;
use repoquery::metadata::{EntityMeta, Metadata, PropertyMeta, ScalarType};
use repoquery::method::{CollectionKind, ElementType, MethodSignature, ParamDecl, ParamType, ReturnType};
use repoquery::query::builder::{self, BuildContext};
use repoquery::{Argument, QueryDescriptor, RepositoryConfig};
use std::collections::BTreeSet;

const PROPERTIES: &[&str] = &["Status", "Name", "Total", "Created", "CustomerName"];

/// Operator suffix and the number of placeholders it takes.
const OPERATORS: &[(&str, usize)] = &[
    ("", 1),
    ("Not", 1),
    ("GreaterThan", 1),
    ("LessThanEqual", 1),
    ("Between", 2),
    ("Like", 1),
    ("StartingWith", 1),
    ("IsNull", 0),
    ("IsNotNull", 0),
    ("IgnoreCase", 1),
];

fn metadata() -> Metadata {
    Metadata::new()
        .entity(
            EntityMeta::new("Order")
                .property(PropertyMeta::scalar("status", ScalarType::Text))
                .property(PropertyMeta::scalar("name", ScalarType::Text))
                .property(PropertyMeta::scalar("total", ScalarType::Int))
                .property(PropertyMeta::scalar("created", ScalarType::DateTime))
                .property(PropertyMeta::reference("customer", "Customer")),
        )
        .entity(EntityMeta::new("Customer").property(PropertyMeta::scalar("name", ScalarType::Text)))
}

fn list() -> ReturnType {
    ReturnType::Collection {
        kind: CollectionKind::List,
        element: ElementType::Entity("Order".into()),
    }
}

prop_compose! {
    fn part()(property in 0..PROPERTIES.len(), operator in 0..OPERATORS.len(), or in any::<bool>())
        -> (String, usize, bool) {
        let (suffix, arity) = OPERATORS[operator];
        (format!("{}{}", PROPERTIES[property], suffix), arity, or)
    }
}

fn method_name(parts: &[(String, usize, bool)], descending: bool) -> (String, usize) {
    let mut name = String::from("findBy");
    let mut placeholders = 0;
    for (i, (text, arity, or)) in parts.iter().enumerate() {
        if i > 0 {
            name.push_str(if *or { "Or" } else { "And" });
        }
        name.push_str(text);
        placeholders += arity;
    }
    name.push_str(if descending { "OrderByTotalDesc" } else { "OrderByTotalAsc" });
    (name, placeholders)
}

proptest! {
    #[test]
    fn test_names_and_values_match_placeholders(
        parts in prop::collection::vec(part(), 1..6),
        descending in any::<bool>(),
    ) {
        let (name, placeholders) = method_name(&parts, descending);
        let mut signature = MethodSignature::new("Order", name.as_str(), list());
        for _ in 0..placeholders {
            signature = signature.param(ParamDecl::anonymous(ParamType::Scalar(ScalarType::Text)));
        }

        let descriptor = QueryDescriptor::compile(&signature, &metadata(), &[]).unwrap();
        prop_assert_eq!(descriptor.parameter_names().len(), placeholders);
        let unique: BTreeSet<&str> = descriptor.parameter_names().into_iter().collect();
        prop_assert_eq!(unique.len(), placeholders);

        let args: Vec<Argument> = (0..placeholders).map(|i| Argument::from(format!("v{i}"))).collect();
        let config = RepositoryConfig::default();
        let cx = BuildContext { resolver: &PassthroughResolver, config: &config };
        let spec = builder::for_variant(descriptor.variant()).build(&descriptor, &args, &cx).unwrap();
        prop_assert_eq!(spec.parameters.len(), placeholders);
        for name in descriptor.parameter_names() {
            prop_assert!(spec.parameters.contains_key(name));
        }
        prop_assert_eq!(spec.sort.len(), 1);
    }

    #[test]
    fn test_compilation_is_deterministic(parts in prop::collection::vec(part(), 1..4)) {
        let (name, placeholders) = method_name(&parts, false);
        let mut signature = MethodSignature::new("Order", name.as_str(), list());
        for _ in 0..placeholders {
            signature = signature.param(ParamDecl::anonymous(ParamType::Scalar(ScalarType::Text)));
        }
        let a = QueryDescriptor::compile(&signature, &metadata(), &[]).unwrap();
        let b = QueryDescriptor::compile(&signature, &metadata(), &[]).unwrap();
        prop_assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        prop_assert_eq!(a, b);
    }
}

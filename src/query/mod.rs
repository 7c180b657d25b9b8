//! Compiling repository methods into queries and shaping their results.
//!
//! A method goes through two phases:
//!
//! - **Compile** (once per method): the signature is resolved against the metadata into a
//!   [`QueryDescriptor`]. Derived names are parsed by [`derived`], hand-written query text is
//!   bound by [`template`], special parameters are located by [`params`] and the return type
//!   is resolved by [`shape`].
//! - **Invoke** (every call): a [`SpecBuilder`] turns the descriptor and the arguments into a
//!   fresh [`LoadSpecification`], the backend loads it, and the [`ResultMaterializer`] shapes
//!   the rows.
//!
//! # Examples
//!
//! ```
//! use repoquery::metadata::{EntityMeta, Metadata, PropertyMeta, ScalarType};
//! use repoquery::method::{CollectionKind, ElementType, MethodSignature, ParamDecl, ParamType, ReturnType};
//! use repoquery::query::QueryDescriptor;
//!
//! let metadata = Metadata::new().entity(
//!     EntityMeta::new("Order")
//!         .property(PropertyMeta::scalar("status", ScalarType::Text))
//!         .property(PropertyMeta::scalar("created", ScalarType::DateTime)),
//! );
//! let signature = MethodSignature::new(
//!     "Order",
//!     "findDistinctByStatusAndCreatedAfterOrderByCreatedDesc",
//!     ReturnType::Collection {
//!         kind: CollectionKind::List,
//!         element: ElementType::Entity("Order".into()),
//!     },
//! )
//! .param(ParamDecl::named("status", ParamType::Scalar(ScalarType::Text)))
//! .param(ParamDecl::named("after", ParamType::Scalar(ScalarType::DateTime)));
//!
//! let descriptor = QueryDescriptor::compile(&signature, &metadata, &[])?;
//! assert_eq!(
//!     descriptor.condition().map(|c| c.to_string()).as_deref(),
//!     Some("status = :status AND created > :after")
//! );
//! # Ok::<(), repoquery::ConfigError>(())
//! ```

// Condition trees shared by derived queries and ad-hoc contexts
pub mod condition;
#[doc(inline)]
pub use condition::{Condition, Leaf, Operator};

// Method-name parsing
pub mod derived;

// Hand-written query text
pub mod template;

// Special parameter discovery
pub mod params;
#[doc(inline)]
pub use params::SpecialParameters;

// Return shape resolution
pub mod shape;
#[doc(inline)]
pub use shape::{CollectionShape, Element, ReturnShape};

// Compiled, cached form of a method
pub mod descriptor;
#[doc(inline)]
pub use descriptor::{BuilderVariant, ParameterBinding, QueryDescriptor, QueryKind, QuerySource};

// Per-call load specifications and argument types
pub mod spec;
#[doc(inline)]
pub use spec::{
    Argument, Direction, FetchPlan, LoadMode, LoadSpecification, Order, PageRequest, Pagination,
    QueryContext, Sort,
};

// Load specification builders
pub mod builder;
#[doc(inline)]
pub use builder::{BuildContext, SpecBuilder};

// Result shaping
pub mod materialize;
#[doc(inline)]
pub use materialize::{Item, ItemStream, Loaded, Page, QueryResult, ResultMaterializer, Slice};

//! Repository facade.
//!
//! A [`Repository`] owns the declared methods of one or more entities and the collaborators
//! they load through. Each method compiles to a [`QueryDescriptor`] exactly once, either when
//! the repository is built or on first use, and every invocation after that only builds a
//! load specification, loads it and shapes the rows.
//!
//! # Examples
//!
//! ```
//! use repoquery::backend::InMemoryBackend;
//! use repoquery::metadata::{EntityMeta, Metadata, PropertyMeta, ScalarType};
//! use repoquery::method::{ElementType, MethodSignature, ParamDecl, ParamType, ReturnType};
//! use repoquery::value::Row;
//! use repoquery::Repository;
//! use std::sync::Arc;
//!
//! let metadata = Metadata::new().entity(
//!     EntityMeta::new("Order").property(PropertyMeta::scalar("status", ScalarType::Text)),
//! );
//! let backend = Arc::new(InMemoryBackend::new().with_rows(
//!     "Order",
//!     vec![Row::new().with("status", "open"), Row::new().with("status", "open")],
//! ));
//! let repository = Repository::builder(metadata, backend)
//!     .method(
//!         MethodSignature::new("Order", "countByStatus", ReturnType::Count)
//!             .param(ParamDecl::named("status", ParamType::Scalar(ScalarType::Text))),
//!     )
//!     .build()?;
//!
//! let result = repository.invoke("countByStatus", vec!["open".into()])?;
//! assert_eq!(result.count(), Some(2));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::backend::{FetchPlanResolver, LoadBackend, LoadInterceptor, PassthroughResolver, QueryTextHook};
use crate::config::RepositoryConfig;
use crate::error::{ConfigError, QueryError};
use crate::metadata::Metadata;
use crate::method::MethodSignature;
use crate::query::builder::{self, BuildContext};
use crate::query::descriptor::QueryDescriptor;
use crate::query::materialize::{Loaded, QueryResult, ResultMaterializer};
use crate::query::shape::ReturnShape;
use crate::query::spec::{Argument, LoadMode, LoadSpecification};
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// A declared method and its compiled form, filled in at most once.
struct MethodBinding {
    signature: MethodSignature,
    compiled: OnceLock<Result<Arc<QueryDescriptor>, ConfigError>>,
}

pub struct RepositoryBuilder {
    metadata: Metadata,
    backend: Arc<dyn LoadBackend>,
    resolver: Arc<dyn FetchPlanResolver>,
    hooks: Vec<Arc<dyn QueryTextHook>>,
    interceptors: Vec<Arc<dyn LoadInterceptor>>,
    config: RepositoryConfig,
    methods: Vec<MethodSignature>,
}

impl RepositoryBuilder {
    pub fn new(metadata: Metadata, backend: Arc<dyn LoadBackend>) -> Self {
        Self {
            metadata,
            backend,
            resolver: Arc::new(PassthroughResolver),
            hooks: Vec::new(),
            interceptors: Vec::new(),
            config: RepositoryConfig::default(),
            methods: Vec::new(),
        }
    }

    pub fn resolver(mut self, resolver: Arc<dyn FetchPlanResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Adds a query text hook. Hooks run in the order they were added.
    pub fn hook(mut self, hook: Arc<dyn QueryTextHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Adds a load interceptor. Interceptors run in the order they were added.
    pub fn interceptor(mut self, interceptor: Arc<dyn LoadInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn config(mut self, config: RepositoryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn method(mut self, signature: MethodSignature) -> Self {
        self.methods.push(signature);
        self
    }

    pub fn methods(mut self, signatures: impl IntoIterator<Item = MethodSignature>) -> Self {
        self.methods.extend(signatures);
        self
    }

    /// Builds the repository.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidMethodName` when two methods share a name. With
    /// `eager_compile` set, every method is compiled here and the first failure is returned.
    pub fn build(self) -> Result<Repository, ConfigError> {
        let mut methods = BTreeMap::new();
        for signature in self.methods {
            let name = signature.name.clone();
            let binding = MethodBinding {
                signature,
                compiled: OnceLock::new(),
            };
            if methods.insert(name.clone(), binding).is_some() {
                return Err(ConfigError::InvalidMethodName {
                    method: name,
                    reason: "declared more than once".to_string(),
                });
            }
        }

        let repository = Repository {
            metadata: self.metadata,
            backend: self.backend,
            resolver: self.resolver,
            hooks: self.hooks,
            interceptors: self.interceptors,
            config: self.config,
            methods,
        };

        if repository.config.eager_compile {
            let mut first_error = None;
            for binding in repository.methods.values() {
                if let Err(err) = repository.compile(binding) {
                    log::error!("{}", err);
                    first_error.get_or_insert(err);
                }
            }
            if let Some(err) = first_error {
                return Err(err);
            }
        }
        log::info!(
            "repository ready with {} method(s), eager compile {}",
            repository.methods.len(),
            repository.config.eager_compile
        );
        Ok(repository)
    }
}

pub struct Repository {
    metadata: Metadata,
    backend: Arc<dyn LoadBackend>,
    resolver: Arc<dyn FetchPlanResolver>,
    hooks: Vec<Arc<dyn QueryTextHook>>,
    interceptors: Vec<Arc<dyn LoadInterceptor>>,
    config: RepositoryConfig,
    methods: BTreeMap<String, MethodBinding>,
}

impl Repository {
    pub fn builder(metadata: Metadata, backend: Arc<dyn LoadBackend>) -> RepositoryBuilder {
        RepositoryBuilder::new(metadata, backend)
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Declared method names in sorted order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Compiled descriptor of a method, compiling it on first use.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::UnknownMethod` when no method has that name, and
    /// `QueryError::Config` when the method does not compile. A failed compile is cached and
    /// reported again on every later call.
    pub fn descriptor(&self, method: &str) -> Result<Arc<QueryDescriptor>, QueryError> {
        let binding = self
            .methods
            .get(method)
            .ok_or_else(|| QueryError::UnknownMethod(method.to_string()))?;
        Ok(self.compile(binding)?)
    }

    /// Invokes a method.
    ///
    /// # Arguments
    ///
    /// * `method` - Declared method name
    /// * `args` - One argument per declared parameter, special parameters included
    ///
    /// # Returns
    ///
    /// Returns the result in the method's declared shape.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` when the method is unknown or does not compile, the arguments do
    /// not fit the declaration, the backend fails, or a single result gets zero or several
    /// rows.
    pub fn invoke(&self, method: &str, args: Vec<Argument>) -> Result<QueryResult, QueryError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::invoke_span(method).entered();

        let start = Instant::now();
        let mut rows_loaded = 0usize;
        let result = self.run(method, &args, &mut rows_loaded);
        let elapsed = start.elapsed();

        match &result {
            Ok(_) => log::debug!("`{}` loaded {} row(s) in {:?}", method, rows_loaded, elapsed),
            Err(err) => log::debug!("`{}` failed after {:?}: {}", method, elapsed, err),
        }
        #[cfg(feature = "metrics")]
        METRICS.record_invocation(method, elapsed, rows_loaded, result.is_ok());

        result
    }

    fn run(&self, method: &str, args: &[Argument], rows_loaded: &mut usize) -> Result<QueryResult, QueryError> {
        let descriptor = self.descriptor(method)?;
        let cx = BuildContext {
            resolver: self.resolver.as_ref(),
            config: &self.config,
        };
        let mut spec = builder::for_variant(descriptor.variant()).build(&descriptor, args, &cx)?;
        for interceptor in &self.interceptors {
            interceptor.before_load(&descriptor, &mut spec);
        }

        let loaded = self.load(&descriptor, &spec, args)?;
        if let Loaded::Rows { rows, .. } = &loaded {
            *rows_loaded = rows.len();
        }
        ResultMaterializer::new(&descriptor, &self.metadata).materialize(loaded)
    }

    fn load(
        &self,
        descriptor: &QueryDescriptor,
        spec: &LoadSpecification,
        args: &[Argument],
    ) -> Result<Loaded, QueryError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::load_span(&spec.entity, &format!("{:?}", spec.mode)).entered();

        if spec.mode == LoadMode::Count {
            return Ok(Loaded::Count(self.backend.count(spec)?));
        }

        let rows = self.backend.execute(spec)?;
        let page = descriptor
            .special()
            .page
            .and_then(|index| match args.get(index) {
                Some(Argument::Page(page)) => Some(page.clone()),
                _ => None,
            });
        let total = match (descriptor.shape(), &page) {
            (ReturnShape::Page(_), Some(page)) if page.is_paged() => {
                Some(self.backend.count(&spec.to_count())?)
            }
            _ => None,
        };
        Ok(Loaded::Rows { rows, page, total })
    }

    fn compile(&self, binding: &MethodBinding) -> Result<Arc<QueryDescriptor>, ConfigError> {
        binding
            .compiled
            .get_or_init(|| {
                let signature = &binding.signature;
                #[cfg(feature = "tracing")]
                let _span = tracing_helpers::compile_span(&signature.name, &signature.entity).entered();

                let compiled = QueryDescriptor::compile(signature, &self.metadata, &self.hooks).map(Arc::new);
                #[cfg(feature = "metrics")]
                METRICS.record_compile(&signature.name, compiled.is_ok());
                compiled
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::metadata::{EntityMeta, PropertyMeta, ScalarType};
    use crate::method::{CollectionKind, ElementType, ParamDecl, ParamType, ReturnType};
    use crate::value::{Row, Value};
    use std::sync::Mutex;

    fn metadata() -> Metadata {
        Metadata::new().entity(
            EntityMeta::new("Order")
                .property(PropertyMeta::scalar("id", ScalarType::Int))
                .property(PropertyMeta::scalar("status", ScalarType::Text)),
        )
    }

    fn backend() -> Arc<InMemoryBackend> {
        Arc::new(InMemoryBackend::new().with_rows(
            "Order",
            vec![
                Row::new().with("id", 1).with("status", "open"),
                Row::new().with("id", 2).with("status", "closed"),
            ],
        ))
    }

    fn list() -> ReturnType {
        ReturnType::Collection {
            kind: CollectionKind::List,
            element: ElementType::Entity("Order".into()),
        }
    }

    fn by_status() -> MethodSignature {
        MethodSignature::new("Order", "findByStatus", list())
            .param(ParamDecl::named("status", ParamType::Scalar(ScalarType::Text)))
    }

    fn broken() -> MethodSignature {
        MethodSignature::new("Order", "findByColour", list())
            .param(ParamDecl::named("colour", ParamType::Scalar(ScalarType::Text)))
    }

    fn lazy() -> RepositoryConfig {
        RepositoryConfig {
            eager_compile: false,
            ..RepositoryConfig::default()
        }
    }

    #[test]
    fn test_eager_compile_reports_broken_method() {
        let err = Repository::builder(metadata(), backend())
            .method(by_status())
            .method(broken())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::UnknownProperty { .. }));
    }

    #[test]
    fn test_lazy_compile_defers_and_caches_failure() {
        let repository = Repository::builder(metadata(), backend())
            .config(lazy())
            .methods([by_status(), broken()])
            .build()
            .unwrap();

        let items = repository
            .invoke("findByStatus", vec!["open".into()])
            .unwrap()
            .into_items()
            .unwrap();
        assert_eq!(items.len(), 1);

        for _ in 0..2 {
            assert!(matches!(
                repository.invoke("findByColour", vec!["red".into()]),
                Err(QueryError::Config(ConfigError::UnknownProperty { .. }))
            ));
        }
    }

    #[test]
    fn test_descriptor_is_compiled_once() {
        let repository = Repository::builder(metadata(), backend())
            .method(by_status())
            .build()
            .unwrap();
        let a = repository.descriptor("findByStatus").unwrap();
        let b = repository.descriptor("findByStatus").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unknown_and_duplicate_methods() {
        let repository = Repository::builder(metadata(), backend())
            .method(by_status())
            .build()
            .unwrap();
        assert!(matches!(
            repository.invoke("findById", vec![]),
            Err(QueryError::UnknownMethod(name)) if name == "findById"
        ));

        let err = Repository::builder(metadata(), backend())
            .methods([by_status(), by_status()])
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::InvalidMethodName { .. }));
    }

    struct Recording {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl LoadInterceptor for Recording {
        fn before_load(&self, descriptor: &QueryDescriptor, spec: &mut LoadSpecification) {
            self.seen.lock().unwrap().push(descriptor.method().to_string());
            spec.hints.insert("intercepted".into(), Value::Bool(true));
        }
    }

    #[test]
    fn test_interceptors_see_every_load() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let backend = backend();
        let repository = Repository::builder(metadata(), backend.clone())
            .interceptor(Arc::new(Recording { seen: Arc::clone(&seen) }))
            .method(by_status())
            .build()
            .unwrap();
        repository.invoke("findByStatus", vec!["open".into()]).unwrap();
        repository.invoke("findByStatus", vec!["closed".into()]).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["findByStatus", "findByStatus"]);
        let received = backend.received();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].hints.get("intercepted"), Some(&Value::Bool(true)));
        assert_eq!(received[1].parameters.get("status"), Some(&Value::from("closed")));
    }
}

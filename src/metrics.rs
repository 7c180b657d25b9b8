//! Prometheus metrics and tracing spans for repository invocations.

#[cfg(feature = "metrics")]
use once_cell::sync::Lazy;
#[cfg(feature = "metrics")]
use opentelemetry::{
    global,
    metrics::{Counter, Histogram},
    KeyValue,
};
#[cfg(feature = "metrics")]
use opentelemetry_prometheus::PrometheusExporter;
#[cfg(feature = "metrics")]
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

#[cfg(feature = "metrics")]
pub static METRICS: Lazy<RepositoryMetrics> = Lazy::new(RepositoryMetrics::init);

#[cfg(feature = "metrics")]
pub struct RepositoryMetrics {
    pub exporter: PrometheusExporter,
    pub invocations_total: Counter<u64>,
    pub invocation_duration: Histogram<f64>,
    pub rows_materialized: Histogram<u64>,
    pub failures_total: Counter<u64>,
    pub compile_failures: Counter<u64>,
    pub compiled_methods: Arc<AtomicUsize>,
}

#[cfg(feature = "metrics")]
impl RepositoryMetrics {
    pub fn init() -> Self {
        let exporter = opentelemetry_prometheus::exporter().build().expect("failed to build prometheus exporter");
        let meter = global::meter("repoquery");

        let invocations_total = meter.u64_counter("repoquery_invocations_total")
            .with_description("Total repository method invocations").build();

        let invocation_duration = meter.f64_histogram("repoquery_invocation_duration_seconds")
            .with_description("Duration of repository method invocations").build();

        let rows_materialized = meter.u64_histogram("repoquery_rows_materialized")
            .with_description("Rows materialized per invocation").build();

        let failures_total = meter.u64_counter("repoquery_invocation_failures_total")
            .with_description("Invocations that ended in an error").build();

        let compile_failures = meter.u64_counter("repoquery_compile_failures_total")
            .with_description("Method declarations that failed to compile").build();

        let compiled_methods = Arc::new(AtomicUsize::new(0));
        let compiled_clone = Arc::clone(&compiled_methods);

        meter.u64_observable_gauge("repoquery_compiled_methods")
            .with_description("Query descriptors compiled and cached")
            .with_callback(move |observer| {
                observer.observe(compiled_clone.load(Ordering::Relaxed) as u64, &[]);
            })
            .build();

        Self {
            exporter,
            invocations_total,
            invocation_duration,
            rows_materialized,
            failures_total,
            compile_failures,
            compiled_methods,
        }
    }

    pub fn record_invocation(&self, method: &str, elapsed: std::time::Duration, rows: usize, ok: bool) {
        let labels = [KeyValue::new("method", method.to_string())];
        self.invocations_total.add(1, &labels);
        self.invocation_duration.record(elapsed.as_secs_f64(), &labels);
        self.rows_materialized.record(rows as u64, &labels);
        if !ok {
            self.failures_total.add(1, &labels);
        }
    }

    pub fn record_compile(&self, method: &str, ok: bool) {
        if ok {
            self.compiled_methods.fetch_add(1, Ordering::Relaxed);
        } else {
            self.compile_failures
                .add(1, &[KeyValue::new("method", method.to_string())]);
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn compile_span(method: &str, entity: &str) -> Span {
        tracing::debug_span!("repoquery.compile", method = %method, entity = %entity)
    }

    pub fn invoke_span(method: &str) -> Span {
        tracing::info_span!("repoquery.invoke", method = %method)
    }

    pub fn load_span(entity: &str, mode: &str) -> Span {
        tracing::debug_span!("repoquery.load", entity = %entity, mode = %mode)
    }
}

//! Human-readable descriptions of compiled methods.

use colored::Colorize;
use repoquery::query::{BuilderVariant, QuerySource, ReturnShape};
use repoquery::{ConfigError, QueryDescriptor, RepositoryConfig, Value};
use std::fmt::Write;

/// Multi-line description of a compiled method.
///
/// Fetch plan and hints are shown as they apply when no call-time value overrides them:
/// the method's own declaration over the configured defaults.
pub fn explain(descriptor: &QueryDescriptor, config: &RepositoryConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} on {}", descriptor.method().bold(), descriptor.entity().cyan());
    let _ = writeln!(out, "  kind:       {:?} ({:?} builder)", descriptor.kind(), descriptor.variant());

    match descriptor.source() {
        QuerySource::Derived { condition: Some(condition) } => {
            let _ = writeln!(out, "  condition:  {}", condition);
        }
        QuerySource::Derived { condition: None } => {
            let _ = writeln!(out, "  condition:  {}", "<none>".dimmed());
        }
        QuerySource::Template { text } => {
            let _ = writeln!(out, "  query:      {}", text);
        }
    }

    if descriptor.distinct() {
        let _ = writeln!(out, "  distinct:   yes");
    }
    if let Some(limit) = descriptor.max_results() {
        let _ = writeln!(out, "  limit:      {}", limit);
    }
    if !descriptor.static_sort().is_empty() {
        let orders: Vec<String> = descriptor.static_sort().iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "  sort:       {}", orders.join(", "));
    }

    let bindings: Vec<String> = descriptor
        .bindings()
        .iter()
        .map(|b| format!(":{} <- #{}", b.name, b.index))
        .collect();
    if !bindings.is_empty() {
        let _ = writeln!(out, "  bindings:   {}", bindings.join(", "));
    }

    let special = descriptor.special();
    let specials: Vec<String> = [
        ("page", special.page),
        ("sort", special.sort),
        ("fetch plan", special.fetch_plan),
        ("context", special.context),
    ]
    .iter()
    .filter_map(|(name, index)| index.map(|i| format!("{name} #{i}")))
    .collect();
    if !specials.is_empty() {
        let _ = writeln!(out, "  special:    {}", specials.join(", "));
    }

    if descriptor.variant() != BuilderVariant::Count {
        match descriptor.fetch_plan() {
            Some(plan) => {
                let _ = writeln!(out, "  fetch plan: {}", plan);
            }
            None => {
                let _ = writeln!(
                    out,
                    "  fetch plan: {} {}",
                    config.default_fetch_plan,
                    "(default)".dimmed()
                );
            }
        }
    }

    let mut hints: Vec<(String, String)> = config
        .default_hints
        .iter()
        .filter(|(name, _)| !descriptor.hints().contains_key(*name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    hints.extend(
        descriptor
            .hints()
            .iter()
            .map(|(name, value)| (name.clone(), hint_text(value))),
    );
    hints.sort();
    if !hints.is_empty() {
        let hints: Vec<String> = hints.iter().map(|(name, value)| format!("{name}={value}")).collect();
        let _ = writeln!(out, "  hints:      {}", hints.join(", "));
    }
    let _ = writeln!(out, "  returns:    {}", shape(descriptor.shape()));
    if let Ok(fingerprint) = descriptor.fingerprint() {
        let _ = writeln!(out, "  fingerprint: {}", fingerprint.dimmed());
    }
    out
}

/// One-line description of a compile failure.
pub fn failure(method: &str, error: &ConfigError) -> String {
    format!("{} {}: {}", "✗".red(), method.bold(), error)
}

fn hint_text(value: &Value) -> String {
    match value {
        Value::Text(text) => text.clone(),
        other => other.to_string(),
    }
}

fn shape(shape: &ReturnShape) -> String {
    match shape {
        ReturnShape::Single(e) => format!("single {e:?}"),
        ReturnShape::Optional(e) => format!("optional {e:?}"),
        ReturnShape::Collection { kind, element } => format!("{kind:?} of {element:?}").to_lowercase(),
        ReturnShape::Stream(e) => format!("stream of {e:?}"),
        ReturnShape::Slice(e) => format!("slice of {e:?} (reads one row ahead)"),
        ReturnShape::Page(e) => format!("page of {e:?} (with total count)"),
        ReturnShape::Count => "count".to_string(),
        ReturnShape::Exists => "exists".to_string(),
    }
}

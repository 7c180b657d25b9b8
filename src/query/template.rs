//! Placeholder binding for hand-written query text.
//!
//! Three placeholder styles are accepted and all are rewritten to the backend's `:name`
//! form:
//!
//! - `:name` binds the parameter whose alias, or failing that whose declared name, is `name`
//! - `?N` binds the Nth declared parameter (1-based, special parameters included in the count)
//! - `?` binds the next bindable parameter not yet consumed by a bare `?`
//!
//! Quoted string literals and `::` casts are copied through untouched.

use crate::error::ConfigError;
use crate::method::ParamDecl;
use crate::query::descriptor::ParameterBinding;
use crate::query::params::ParameterIndex;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'(?:[^']|'')*'|::|:([A-Za-z_][A-Za-z0-9_]*)|\?(\d+)?")
        .unwrap_or_else(|e| panic!("placeholder pattern does not compile: {e}"))
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundTemplate {
    /// Query text with every placeholder in `:name` form.
    pub text: String,
    /// Distinct bindings in order of first appearance.
    pub bindings: Vec<ParameterBinding>,
}

pub fn bind(
    method: &str,
    text: &str,
    params: &[ParamDecl],
    index: &ParameterIndex,
) -> Result<BoundTemplate, ConfigError> {
    let mut binder = Binder {
        method,
        params,
        index,
        next_bare: 0,
        bindings: Vec::new(),
        taken: params
            .iter()
            .filter_map(ParamDecl::binding_name)
            .map(str::to_string)
            .collect(),
    };

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for captures in PLACEHOLDER.captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let position = if let Some(name) = captures.get(1) {
            Some(binder.by_name(name.as_str())?)
        } else if whole.as_str().starts_with('?') {
            match captures.get(2) {
                Some(number) => Some(binder.by_position(whole.as_str(), number.as_str())?),
                None => Some(binder.next_bindable()?),
            }
        } else {
            None
        };
        out.push_str(&text[last..whole.start()]);
        match position {
            Some(argument) => {
                let name = binder.bind(argument);
                out.push(':');
                out.push_str(&name);
            }
            None => out.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);

    log::debug!(
        "bound query text of `{}`: {} placeholder binding(s)",
        method,
        binder.bindings.len()
    );
    Ok(BoundTemplate {
        text: out,
        bindings: binder.bindings,
    })
}

struct Binder<'a> {
    method: &'a str,
    params: &'a [ParamDecl],
    index: &'a ParameterIndex,
    next_bare: usize,
    bindings: Vec<ParameterBinding>,
    taken: BTreeSet<String>,
}

impl Binder<'_> {
    fn by_name(&self, name: &str) -> Result<usize, ConfigError> {
        let found = self
            .params
            .iter()
            .position(|p| p.alias.as_deref() == Some(name))
            .or_else(|| {
                self.params
                    .iter()
                    .position(|p| p.alias.is_none() && p.name.as_deref() == Some(name))
            });
        match found {
            Some(position) => self.bindable(position, &format!(":{name}")),
            None => Err(self.unbound(format!(":{name}"))),
        }
    }

    fn by_position(&self, placeholder: &str, number: &str) -> Result<usize, ConfigError> {
        let position = number
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=self.params.len()).contains(n))
            .ok_or_else(|| self.unbound(placeholder.to_string()))?;
        self.bindable(position - 1, placeholder)
    }

    fn next_bindable(&mut self) -> Result<usize, ConfigError> {
        let position = self
            .index
            .bindable
            .get(self.next_bare)
            .copied()
            .ok_or_else(|| self.unbound("?".to_string()))?;
        self.next_bare += 1;
        Ok(position)
    }

    fn bindable(&self, position: usize, placeholder: &str) -> Result<usize, ConfigError> {
        match self.index.special.kind_at(position) {
            Some(kind) => Err(ConfigError::SpecialParameterPlaceholder {
                method: self.method.to_string(),
                placeholder: placeholder.to_string(),
                kind,
                index: position,
            }),
            None if !self.index.bindable.contains(&position) => Err(self.unbound(placeholder.to_string())),
            None => Ok(position),
        }
    }

    /// Binding name for the argument at `position`, registering it on first use.
    fn bind(&mut self, position: usize) -> String {
        if let Some(existing) = self.bindings.iter().find(|b| b.index == position) {
            return existing.name.clone();
        }
        let name = match self.params.get(position).and_then(ParamDecl::binding_name) {
            Some(name) => name.to_string(),
            None => {
                let mut candidate = format!("arg{position}");
                while self.taken.contains(&candidate) {
                    candidate.push('_');
                }
                self.taken.insert(candidate.clone());
                candidate
            }
        };
        self.bindings.push(ParameterBinding {
            name: name.clone(),
            index: position,
        });
        name
    }

    fn unbound(&self, placeholder: String) -> ConfigError {
        ConfigError::UnboundPlaceholder {
            method: self.method.to_string(),
            placeholder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::ScalarType;
    use crate::method::{ParamType, SpecialKind};
    use crate::query::params;

    fn run(text: &str, decls: &[ParamDecl]) -> Result<BoundTemplate, ConfigError> {
        let index = params::resolve(decls);
        bind("m", text, decls, &index)
    }

    fn text(name: &str) -> ParamDecl {
        ParamDecl::named(name, ParamType::Scalar(ScalarType::Text))
    }

    fn anon() -> ParamDecl {
        ParamDecl::anonymous(ParamType::Scalar(ScalarType::Int))
    }

    #[test]
    fn test_named_placeholders() {
        let bound = run(
            "select o from Order o where o.status = :status and o.name = :name",
            &[text("name"), text("status")],
        )
        .unwrap();
        assert_eq!(
            bound.bindings,
            vec![
                ParameterBinding { name: "status".into(), index: 1 },
                ParameterBinding { name: "name".into(), index: 0 },
            ]
        );
    }

    #[test]
    fn test_alias_takes_precedence() {
        let bound = run("where a = :since", &[text("since"), text("from").with_alias("since")]).unwrap();
        assert_eq!(bound.bindings[0].index, 1);
    }

    #[test]
    fn test_positional_and_bare_markers() {
        let decls = [anon(), ParamDecl::named("page", ParamType::Page), anon()];
        let bound = run("where a = ?1 and b = ?3", &decls).unwrap();
        assert_eq!(bound.text, "where a = :arg0 and b = :arg2");

        let bound = run("where a = ? and b = ?", &decls).unwrap();
        assert_eq!(bound.text, "where a = :arg0 and b = :arg2");
    }

    #[test]
    fn test_repeated_placeholder_binds_once() {
        let bound = run("where a = :x or b = :x", &[text("x")]).unwrap();
        assert_eq!(bound.bindings.len(), 1);
        assert_eq!(bound.text, "where a = :x or b = :x");
    }

    #[test]
    fn test_literals_and_casts_are_skipped() {
        let bound = run("where a = ':nope' and b::text = :x and c = 'it''s ?'", &[text("x")]).unwrap();
        assert_eq!(bound.bindings.len(), 1);
        assert_eq!(bound.text, "where a = ':nope' and b::text = :x and c = 'it''s ?'");
    }

    #[test]
    fn test_unbound_placeholder() {
        assert!(matches!(
            run("where a = :missing", &[text("x")]),
            Err(ConfigError::UnboundPlaceholder { placeholder, .. }) if placeholder == ":missing"
        ));
        assert!(matches!(
            run("where a = ?4", &[text("x")]),
            Err(ConfigError::UnboundPlaceholder { .. })
        ));
        assert!(matches!(
            run("where a = ? and b = ?", &[text("x")]),
            Err(ConfigError::UnboundPlaceholder { .. })
        ));
    }

    #[test]
    fn test_positional_marker_on_special_parameter() {
        let decls = [text("x"), ParamDecl::named("sort", ParamType::Sort)];
        match run("where a = ?2", &decls) {
            Err(ConfigError::SpecialParameterPlaceholder { kind, index, .. }) => {
                assert_eq!(kind, SpecialKind::Sort);
                assert_eq!(index, 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
